//! Event observer trait and implementations.

use crate::protocol::GameEvent;
use crate::stream::TurnOutcome;

/// Longest payload preview written to the log, in bytes.
const PREVIEW_BYTES: usize = 200;

/// Observer for events emitted during a turn.
///
/// # Implementation Notes
///
/// - Implementations must be lightweight; blocking delays stream processing.
/// - Methods have default empty implementations for selective observation.
/// - Observers are called synchronously on the driver task, before the
///   event is queued for the consumer.
pub trait EventObserver: Send + Sync {
    /// Called for every event the turn emits, in order.
    fn on_event(&self, event: &GameEvent) {
        let _ = event;
    }

    /// Called once when a turn ends, successfully or not.
    ///
    /// Not called when the consumer drops the stream early.
    fn on_turn_complete(&self, outcome: &TurnOutcome) {
        let _ = outcome;
    }
}

/// Simple logging observer that logs events using tracing.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use libmaya::{GameClient, LogLevel, LoggingObserver};
///
/// let client = GameClient::builder(generator)
///     .observer(Arc::new(LoggingObserver::with_level(LogLevel::Info)))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    level: LogLevel,
}

/// Log level for LoggingObserver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at trace level.
    Trace,
    /// Log at debug level (default).
    #[default]
    Debug,
    /// Log at info level.
    Info,
}

impl LoggingObserver {
    /// Create a new logging observer with debug level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging observer with a specific level.
    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    /// The level events are logged at.
    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl EventObserver for LoggingObserver {
    fn on_event(&self, event: &GameEvent) {
        let kind = event.event_type();
        let payload = match event {
            GameEvent::Status(status) => status.to_string(),
            GameEvent::Code(artifact) => preview(&artifact.html),
            other => preview(other.text().unwrap_or_default()),
        };

        match self.level {
            LogLevel::Trace => {
                tracing::trace!(event_type = %kind, payload = %payload, "game_event");
            }
            LogLevel::Debug => {
                tracing::debug!(event_type = %kind, payload = %payload, "game_event");
            }
            LogLevel::Info => {
                tracing::info!(event_type = %kind, payload = %payload, "game_event");
            }
        }
    }

    fn on_turn_complete(&self, outcome: &TurnOutcome) {
        let has_code = outcome.artifact.is_some();
        let error = outcome.error.as_deref().unwrap_or("");

        match self.level {
            LogLevel::Trace => {
                tracing::trace!(has_code, events = outcome.events, error, "turn_complete");
            }
            LogLevel::Debug => {
                tracing::debug!(has_code, events = outcome.events, error, "turn_complete");
            }
            LogLevel::Info => {
                tracing::info!(has_code, events = outcome.events, error, "turn_complete");
            }
        }
    }
}

/// Truncate to at most [`PREVIEW_BYTES`] on a char boundary.
fn preview(content: &str) -> String {
    if content.len() <= PREVIEW_BYTES {
        return content.to_string();
    }
    let mut end = PREVIEW_BYTES;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &content[..end], content.len())
}
