//! Type-safe options shared by sessions and generation requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which instruction set a generator should load for a request.
///
/// The choice depends on whether the session has generated assets; the
/// caller decides that and passes it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstructionVariant {
    /// Instructions for games drawn with canvas primitives only.
    #[default]
    Basic,
    /// Instructions that reference previously generated image assets.
    WithAssets,
}

impl InstructionVariant {
    /// Select the variant for a request.
    pub fn for_assets(has_assets: bool) -> Self {
        if has_assets {
            InstructionVariant::WithAssets
        } else {
            InstructionVariant::Basic
        }
    }
}

impl fmt::Display for InstructionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionVariant::Basic => write!(f, "basic"),
            InstructionVariant::WithAssets => write!(f, "with_assets"),
        }
    }
}

/// Newtype for session IDs to prevent string mixups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create a new SessionId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    /// Create a fresh random session ID.
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    /// Get the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
