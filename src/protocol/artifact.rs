//! The generated game artifact.

use serde::{Deserialize, Serialize};

/// The structured result of one completed code section.
///
/// Styling and script are embedded inline in `html`, so `css` and `js` are
/// always empty today. The three-field shape is part of the wire contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Complete HTML document.
    pub html: String,
    /// Stylesheet, empty when inlined.
    #[serde(default)]
    pub css: String,
    /// Script, empty when inlined.
    #[serde(default)]
    pub js: String,
}

impl CodeArtifact {
    /// Create an artifact with everything inlined in the HTML.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: String::new(),
            js: String::new(),
        }
    }

    /// True when no code was captured.
    pub fn is_empty(&self) -> bool {
        self.html.is_empty() && self.css.is_empty() && self.js.is_empty()
    }
}
