//! RFox Preview
//!
//! A live-preview engine for in-browser site editors. User-authored HTML, CSS
//! and JavaScript are composed into a single self-contained document that is
//! displayed inside a sandboxed frame, with an injected navigation isolator
//! that keeps anchor navigation in-page and stops scripts from moving the
//! frame away from its address.
//!
//! # Features
//!
//! - **Composer**: pure, deterministic `compose(html, css, js)`
//! - **Sessions**: debounced re-rendering with fresh render keys per document
//! - **Frame markup**: host-side `<iframe>` with a safe sandbox policy
//! - **Probe** (default): headless check of the isolation contract using Boa
//!
//! # Example
//!
//! ```
//! use rfpreview::{compose, SourceBundle};
//!
//! let bundle = SourceBundle::new("<h1 id=\"top\">Hi</h1>", "h1 { color: teal; }", "");
//! let doc = rfpreview::render(&bundle);
//! assert!(doc.as_str().contains("<h1 id=\"top\">Hi</h1>"));
//! assert_eq!(doc.as_str(), compose(&bundle.html, &bundle.css, &bundle.js));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod error;
pub use error::{Error, Result};

pub mod compose;
pub use compose::{compose, render, RenderedDocument};

// Host-side frame markup and sandbox policy
pub mod frame;
pub use frame::SandboxPolicy;

// Project directories (templates, exports)
pub mod project;

// Debounced preview sessions
pub mod session;
pub use session::{PreviewFrame, PreviewSession, SessionConfig};

// Headless probe: Boa + mock DOM
#[cfg(feature = "probe")]
pub mod probe;
#[cfg(feature = "probe")]
pub use probe::{PreviewProbe, ProbeConfig};

/// The three raw sources of one project.
///
/// Owned by the caller; the core only ever reads snapshots of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceBundle {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl SourceBundle {
    pub fn new(html: impl Into<String>, css: impl Into<String>, js: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
            js: js.into(),
        }
    }

    /// Starter project shown in a fresh editor.
    pub fn starter() -> Self {
        Self::new(
            "<!DOCTYPE html><html><head><title>New Project</title></head><body><h1>New Project</h1></body></html>",
            "body { font-family: Arial; }",
            "console.log(\"Hello world\");",
        )
    }

    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Html => &self.html,
            SourceKind::Css => &self.css,
            SourceKind::Js => &self.js,
        }
    }

    /// Replace one field, leaving the others untouched.
    pub fn set(&mut self, kind: SourceKind, text: impl Into<String>) {
        let slot = match kind {
            SourceKind::Html => &mut self.html,
            SourceKind::Css => &mut self.css,
            SourceKind::Js => &mut self.js,
        };
        *slot = text.into();
    }

    /// Fields that differ from `other`, in html/css/js order.
    pub fn changed_fields(&self, other: &SourceBundle) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|k| self.get(*k) != other.get(*k))
            .collect()
    }
}

/// Which of the three sources an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Css,
    Js,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Html, SourceKind::Css, SourceKind::Js];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Html => "html",
            SourceKind::Css => "css",
            SourceKind::Js => "js",
        })
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Host container sizing presets.
///
/// Purely a view-layer concern: the composed document never depends on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportProfile {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl ViewportProfile {
    pub fn dimensions(self) -> Viewport {
        match self {
            ViewportProfile::Desktop => Viewport { width: 1280, height: 800 },
            ViewportProfile::Tablet => Viewport { width: 768, height: 1024 },
            ViewportProfile::Mobile => Viewport { width: 375, height: 667 },
        }
    }
}

impl fmt::Display for ViewportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewportProfile::Desktop => "desktop",
            ViewportProfile::Tablet => "tablet",
            ViewportProfile::Mobile => "mobile",
        })
    }
}

impl FromStr for ViewportProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(ViewportProfile::Desktop),
            "tablet" => Ok(ViewportProfile::Tablet),
            "mobile" => Ok(ViewportProfile::Mobile),
            other => Err(Error::ConfigError(format!("unknown viewport profile '{}'", other))),
        }
    }
}

/// Top-level configuration, loadable from a JSON file.
///
/// Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub session: SessionConfig,
    pub sandbox: SandboxPolicy,
    #[cfg(feature = "probe")]
    pub probe: ProbeConfig,
}

impl PreviewConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}
