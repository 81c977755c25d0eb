//! Wire types shared with the transport and session layers.
//!
//! Every event leaving this crate is a [`GameEvent`], serialized as a
//! `{"type": ..., "payload": ...}` JSON envelope:
//!
//! - `status`: `"thinking"` or `"generating"`
//! - `explanation`, `code_chunk`, `features`, `suggestions`, `error`: strings
//! - `code`: a [`CodeArtifact`] object `{html, css, js}`
//!
//! # Example
//!
//! ```
//! use libmaya::protocol::{CodeArtifact, GameEvent};
//!
//! let event = GameEvent::Code(CodeArtifact::from_html("<html></html>"));
//! let frame = event.to_sse().unwrap();
//! assert!(frame.starts_with("data: {\"type\":\"code\""));
//! ```

mod artifact;
mod events;
mod history;

pub use artifact::CodeArtifact;
pub use events::{EventType, GameEvent, Status, SSE_DONE};
pub use history::{ConversationTurn, Role};
