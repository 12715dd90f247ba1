//! Host-side frame markup.
//!
//! The isolator only backs up the sandbox; actual containment comes from the
//! frame attributes produced here. The generated `sandbox` attribute always
//! grants scripts and never grants same-origin or top-level navigation.

use crate::{RenderedDocument, ViewportProfile};
use serde::{Deserialize, Serialize};

/// Sandbox flags applied to the rendering surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    /// Grant `allow-forms` so user forms can submit inside the frame
    pub allow_forms: bool,
}

impl SandboxPolicy {
    /// Value for the frame's `sandbox` attribute.
    pub fn attribute(&self) -> String {
        let mut flags = vec!["allow-scripts"];
        if self.allow_forms {
            flags.push("allow-forms");
        }
        flags.join(" ")
    }
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// `<iframe>` element displaying `doc`.
///
/// `key` is the render key of the document; hosts that diff markup should
/// treat a changed key as a full reload of the frame.
pub fn iframe_markup(
    doc: &RenderedDocument,
    viewport: ViewportProfile,
    key: u64,
    policy: &SandboxPolicy,
) -> String {
    let dims = viewport.dimensions();
    format!(
        "<iframe title=\"preview\" data-render-key=\"{}\" sandbox=\"{}\" width=\"{}\" height=\"{}\" srcdoc=\"{}\"></iframe>",
        key,
        policy.attribute(),
        dims.width,
        dims.height,
        escape_attribute(doc.as_str())
    )
}

/// Minimal standalone host page wrapping one preview frame.
pub fn host_page(
    doc: &RenderedDocument,
    viewport: ViewportProfile,
    key: u64,
    policy: &SandboxPolicy,
) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>Preview ({})</title>\n<style>body {{ margin: 0; background: #f3f3f3; }} iframe {{ display: block; margin: 16px auto; border: 1px solid #ccc; background: #fff; }}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        viewport,
        iframe_markup(doc, viewport, key, policy)
    )
}
