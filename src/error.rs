use std::time::Duration;

use crate::routing::RouteKind;

/// Errors that can occur when using libmaya.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - Upstream errors: the token source failed, stalled, or was dropped
/// - Session and routing errors: bookkeeping around a turn
/// - Protocol errors: malformed envelope JSON
///
/// The streaming parser itself never produces an `Error`; malformed model
/// output degrades to fewer events instead.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Upstream errors
    // -------------------------------------------------------------------------
    /// The upstream token source failed mid-turn.
    #[error("upstream stream failed: {0}")]
    Upstream(String),

    /// The turn exceeded the configured timeout.
    #[error("turn timed out after {0:?}")]
    Timeout(Duration),

    /// The turn was cancelled by dropping its stream.
    #[error("turn cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Session and routing errors
    // -------------------------------------------------------------------------
    /// No session exists with the given id.
    #[error("session not found: {id}")]
    SessionNotFound { id: String },

    /// A route was selected but nothing is registered to handle it.
    #[error("no handler registered for route {route}")]
    NoHandler { route: RouteKind },

    /// The session already used its asset generation allowance.
    #[error("asset generation quota exceeded: {used} of {limit} used")]
    QuotaExceeded { used: u32, limit: u32 },

    // -------------------------------------------------------------------------
    // Protocol errors
    // -------------------------------------------------------------------------
    /// Failed to encode or decode an event envelope.
    #[error("failed to process JSON: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A specialized Result type for libmaya operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an upstream error from anything printable.
    pub fn upstream(message: impl std::fmt::Display) -> Self {
        Self::Upstream(message.to_string())
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Upstream(_) | Error::Cancelled
        )
    }

    /// Text placed into the `error` event shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Upstream(message) => format!("Failed to generate game: {}", message),
            Error::Timeout(duration) => format!(
                "Failed to generate game: no response within {} seconds",
                duration.as_secs()
            ),
            Error::QuotaExceeded { .. } => {
                "Asset generation limit reached for this session".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}
