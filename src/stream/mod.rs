//! Streaming response handling.
//!
//! This module turns a model's token stream into structured
//! [`GameEvent`](crate::protocol::GameEvent)s.
//!
//! # Overview
//!
//! - [`SectionMatcher`] finds section markers in accumulated text
//! - [`StreamingParser`] is the per-turn state machine that emits events
//! - [`TurnStream`] drives a parser on a background task and exposes the
//!   events as an async stream
//! - [`CollectedTurn`] gathers everything a finished turn produced
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use libmaya::protocol::GameEvent;
//! use libmaya::stream::TurnStream;
//!
//! let mut stream = TurnStream::generate(tokens, &config);
//! while let Some(event) = stream.next().await {
//!     match event {
//!         GameEvent::Explanation(text) => println!("{}", text),
//!         GameEvent::Code(artifact) => render(&artifact.html),
//!         GameEvent::Error(message) => eprintln!("{}", message),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! # Cancellation
//!
//! Dropping a [`TurnStream`] cancels the background task. Nothing further
//! is read from the upstream source.

pub mod parser;
pub mod response;
pub mod sections;

pub use parser::{StreamingParser, DEFAULT_SECTION_THRESHOLD};
pub use response::{with_timeout, CollectedTurn, TurnHooks, TurnOutcome, TurnStream};
pub use sections::{find_code_close, Marker, ParseState, SectionMatcher, CODE_FENCE};
