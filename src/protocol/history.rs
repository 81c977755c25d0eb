//! Conversation history entries kept per session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a session's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// HTML of the game produced by this turn, assistant turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// A user request, stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            game_code: None,
            timestamp: Utc::now(),
        }
    }

    /// An assistant reply, stamped now.
    pub fn assistant(content: impl Into<String>, game_code: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            game_code,
            timestamp: Utc::now(),
        }
    }
}
