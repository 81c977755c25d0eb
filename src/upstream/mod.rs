//! Token and event sources that feed a turn.
//!
//! The crate never calls a model itself. A [`Generator`] turns a
//! [`GenerationRequest`] into a [`TokenStream`] of raw text fragments, at
//! whatever granularity the underlying API delivers them. Routes that do
//! not produce model text (publishing, asset generation) yield an
//! [`EventStream`] of ready-made events instead.
//!
//! # Example
//!
//! ```
//! use futures::stream::{self, StreamExt};
//! use libmaya::upstream::{GenerationRequest, Generator, TokenStream};
//!
//! struct Canned(&'static str);
//!
//! impl Generator for Canned {
//!     fn generate(&self, _request: GenerationRequest) -> TokenStream {
//!         stream::iter(vec![Ok(self.0.to_string())]).boxed()
//!     }
//! }
//!
//! let request = GenerationRequest::new("make pong");
//! let _tokens = Canned("## Building Your Game\n").generate(request);
//! ```

use futures::stream::BoxStream;

use crate::config::InstructionVariant;
use crate::protocol::{CodeArtifact, GameEvent};
use crate::Result;

/// Raw text fragments from the model. Errors end the turn.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Ready-made events from a route handler.
pub type EventStream = BoxStream<'static, Result<GameEvent>>;

/// Everything a generator needs for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The user's request text.
    pub prompt: String,
    /// The game being modified, absent for a fresh game.
    pub previous_game: Option<CodeArtifact>,
    /// Whether the session has generated assets to reference.
    pub has_assets: bool,
}

impl GenerationRequest {
    /// A request for a brand new game.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            previous_game: None,
            has_assets: false,
        }
    }

    /// Attach the game to modify.
    pub fn with_previous_game(mut self, game: CodeArtifact) -> Self {
        self.previous_game = Some(game);
        self
    }

    /// Mark whether generated assets are available.
    pub fn with_assets(mut self, has_assets: bool) -> Self {
        self.has_assets = has_assets;
        self
    }

    /// Whether this request modifies an existing game.
    pub fn is_modification(&self) -> bool {
        self.previous_game.is_some()
    }

    /// The instruction set this request calls for.
    pub fn instruction_variant(&self) -> InstructionVariant {
        InstructionVariant::for_assets(self.has_assets)
    }
}

/// Produces the model's streamed answer for a request.
///
/// Implementations wrap whatever LLM client the application uses. The
/// returned stream may yield fragments of any size, including single
/// characters or the whole response at once.
pub trait Generator: Send + Sync {
    /// Start generating. Errors are reported through the stream.
    fn generate(&self, request: GenerationRequest) -> TokenStream;
}
