//! # libmaya
//!
//! Streaming orchestration for LLM-generated browser games.
//!
//! The model answers in markdown: an explanation, one fenced HTML block
//! holding the whole game, a feature list and suggested modifications.
//! This library classifies that answer while it streams and emits typed
//! events a frontend can render live:
//! - Incremental section parsing with exactly one `code` event per turn
//! - Async event streams with cancellation and timeouts
//! - Per-session history, current game and asset quota
//! - Rule-based routing to generation, publishing and asset handlers
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use libmaya::{GameClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = GameClient::builder(Arc::new(MyGenerator::new())).build()?;
//!     let session = client.create_session().await;
//!
//!     let turn = client.send_and_collect(&session, "a snake game").await?;
//!     if let Some(game) = turn.artifact {
//!         std::fs::write("snake.html", game.html)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let mut stream = client.send(&session, "make the snake faster").await?;
//! while let Some(event) = stream.next().await {
//!     sse_body.push_str(&event.to_sse()?);
//! }
//! sse_body.push_str(libmaya::SSE_DONE);
//! ```
//!
//! ## Parsing Without a Runtime
//!
//! ```
//! use libmaya::{GameEvent, StreamingParser};
//!
//! let mut parser = StreamingParser::new();
//! let mut events = parser.process_token("## Game Features\n- Wrap-around walls");
//! events.extend(parser.finalize());
//!
//! assert_eq!(events, vec![GameEvent::Features("- Wrap-around walls".into())]);
//! ```

mod client;
pub mod config;
mod error;
pub mod observer;
pub mod protocol;
pub mod quota;
pub mod routing;
pub mod session;
pub mod stream;
pub mod upstream;

pub use error::{Error, Result};

// Re-export the main client types at crate root
pub use client::{GameClient, GameClientBuilder};
pub use session::{SessionState, SessionStore};

// Re-export commonly used config types at crate root
pub use config::{InstructionVariant, SessionId, TurnConfig, TurnConfigBuilder};

// Re-export commonly used protocol types at crate root
pub use protocol::{CodeArtifact, ConversationTurn, GameEvent, Role, Status, SSE_DONE};

// Re-export commonly used stream types at crate root
pub use stream::{CollectedTurn, ParseState, StreamingParser, TurnOutcome, TurnStream};

// Re-export extension points at crate root
pub use observer::{EventObserver, LogLevel, LoggingObserver};
pub use quota::AssetQuota;
pub use routing::{
    KeywordClassifier, Route, RouteClassifier, RouteHandler, RouteKind, RouteRequest, RouteTable,
};
pub use upstream::{EventStream, GenerationRequest, Generator, TokenStream};
