//! Document composer: turns a `SourceBundle` snapshot into one self-contained
//! HTML document with the navigation isolator injected.
//!
//! The output is a plain template concatenation. Nothing is escaped or
//! validated; containment is the job of the sandboxed surface and the
//! isolator script, not of content filtering.

use crate::SourceBundle;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::fmt;

/// Version tag of the injected isolator asset. Bumped whenever
/// `isolator.js` changes behavior.
pub const ISOLATOR_VERSION: u32 = 2;

/// Injected navigation isolator (runs in the rendered document's `<head>`).
pub const ISOLATOR_SCRIPT: &str = include_str!("isolator.js");

/// Appended after the user's script in the body.
pub const HASH_SHIM_SCRIPT: &str = include_str!("hash_shim.js");

/// Fixed reset placed ahead of the user's stylesheet.
pub const RESET_CSS: &str = "*, *::before, *::after { box-sizing: border-box; max-width: 100%; }\nimg { max-width: 100%; height: auto; }\n";

const HEAD_OPEN: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n<base href=\"/\">\n<style>\n";
const STYLE_CLOSE: &str = "\n</style>\n<script>\n";
const HEAD_CLOSE: &str = "</script>\n</head>\n<body>\n";
const BODY_SCRIPT_OPEN: &str = "\n<script>\n";
const BODY_CLOSE: &str = "</script>\n</body>\n</html>\n";

/// Compose a full preview document from raw sources.
///
/// Pure and total: any three strings are accepted and the same inputs always
/// produce byte-identical output.
pub fn compose(html: &str, css: &str, js: &str) -> String {
    let fixed = HEAD_OPEN.len()
        + RESET_CSS.len()
        + STYLE_CLOSE.len()
        + ISOLATOR_SCRIPT.len()
        + HEAD_CLOSE.len()
        + BODY_SCRIPT_OPEN.len()
        + HASH_SHIM_SCRIPT.len()
        + BODY_CLOSE.len()
        + 1;
    let mut out = String::with_capacity(fixed + html.len() + css.len() + js.len());

    out.push_str(HEAD_OPEN);
    out.push_str(RESET_CSS);
    out.push_str(css);
    out.push_str(STYLE_CLOSE);
    out.push_str(ISOLATOR_SCRIPT);
    out.push_str(HEAD_CLOSE);
    out.push_str(html);
    out.push_str(BODY_SCRIPT_OPEN);
    out.push_str(js);
    // Keeps a trailing line comment in user code from swallowing the shim.
    out.push('\n');
    out.push_str(HASH_SHIM_SCRIPT);
    out.push_str(BODY_CLOSE);
    out
}

/// Compose a `RenderedDocument` from a bundle snapshot.
pub fn render(bundle: &SourceBundle) -> RenderedDocument {
    RenderedDocument {
        markup: compose(&bundle.html, &bundle.css, &bundle.js),
    }
}

/// A fully composed preview document.
///
/// Immutable and identified only by its content. Each render supersedes the
/// previous document wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderedDocument {
    markup: String,
}

impl RenderedDocument {
    /// Document markup, suitable for a sandboxed frame's `srcdoc`.
    pub fn as_str(&self) -> &str {
        &self.markup
    }

    pub fn into_string(self) -> String {
        self.markup
    }

    pub fn len(&self) -> usize {
        self.markup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }

    /// Hex-encoded SHA-256 of the markup.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.markup.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// `data:` URL carrying the document, for surfaces without `srcdoc`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:text/html;charset=utf-8;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(self.markup.as_bytes())
        )
    }
}

impl AsRef<str> for RenderedDocument {
    fn as_ref(&self) -> &str {
        &self.markup
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup)
    }
}

impl From<RenderedDocument> for String {
    fn from(doc: RenderedDocument) -> Self {
        doc.markup
    }
}
