//! The structured event envelope sent to the transport layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::artifact::CodeArtifact;
use crate::Result;

/// Terminating line for a `text/event-stream` response.
pub const SSE_DONE: &str = "data: [DONE]\n\n";

/// Turn lifecycle milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The request was received and is being planned.
    Thinking,
    /// The model is producing output.
    Generating,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Thinking => write!(f, "thinking"),
            Status::Generating => write!(f, "generating"),
        }
    }
}

/// A structured event, serialized as `{"type": ..., "payload": ...}`.
///
/// The `type` strings are part of the wire contract with the frontend and
/// must not change.
///
/// # Example
///
/// ```
/// use libmaya::protocol::GameEvent;
///
/// let event = GameEvent::Explanation("A snake game.".into());
/// assert_eq!(
///     event.to_json().unwrap(),
///     r#"{"type":"explanation","payload":"A snake game."}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GameEvent {
    /// Lifecycle milestone, emitted by the turn driver.
    Status(Status),
    /// Explanation section text.
    Explanation(String),
    /// Full captured code, sent just before the artifact.
    CodeChunk(String),
    /// The game artifact. At most one per turn.
    Code(CodeArtifact),
    /// Feature list text, cumulative for the section.
    Features(String),
    /// Suggested modifications, cumulative for the section.
    Suggestions(String),
    /// Unrecoverable failure message.
    Error(String),
}

/// Discriminant of a [`GameEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Status,
    Explanation,
    CodeChunk,
    Code,
    Features,
    Suggestions,
    Error,
}

impl EventType {
    /// The wire `type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Status => "status",
            EventType::Explanation => "explanation",
            EventType::CodeChunk => "code_chunk",
            EventType::Code => "code",
            EventType::Features => "features",
            EventType::Suggestions => "suggestions",
            EventType::Error => "error",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GameEvent {
    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        GameEvent::Error(message.into())
    }

    /// The event's discriminant.
    pub fn event_type(&self) -> EventType {
        match self {
            GameEvent::Status(_) => EventType::Status,
            GameEvent::Explanation(_) => EventType::Explanation,
            GameEvent::CodeChunk(_) => EventType::CodeChunk,
            GameEvent::Code(_) => EventType::Code,
            GameEvent::Features(_) => EventType::Features,
            GameEvent::Suggestions(_) => EventType::Suggestions,
            GameEvent::Error(_) => EventType::Error,
        }
    }

    /// Text payload for the string-carrying variants.
    pub fn text(&self) -> Option<&str> {
        match self {
            GameEvent::Explanation(s)
            | GameEvent::CodeChunk(s)
            | GameEvent::Features(s)
            | GameEvent::Suggestions(s)
            | GameEvent::Error(s) => Some(s),
            GameEvent::Status(_) | GameEvent::Code(_) => None,
        }
    }

    /// Get the artifact if this is a Code event.
    pub fn as_code(&self) -> Option<&CodeArtifact> {
        match self {
            GameEvent::Code(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Check if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, GameEvent::Error(_))
    }

    /// Serialize to the JSON envelope.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON envelope.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render one server-sent-events frame: `data: <json>\n\n`.
    pub fn to_sse(&self) -> Result<String> {
        Ok(format!("data: {}\n\n", self.to_json()?))
    }
}
