//! Request routing.
//!
//! A [`RouteClassifier`] turns a prompt plus the session's state into a
//! [`Route`]. Routes the crate does not implement itself are served by a
//! [`RouteHandler`] looked up in a [`RouteTable`].
//!
//! # Example
//!
//! ```
//! use libmaya::routing::{KeywordClassifier, Route, RouteClassifier};
//! use libmaya::session::SessionState;
//!
//! let session = SessionState::new(1);
//! let route = KeywordClassifier::new().classify("make a snake game", &session);
//! assert!(matches!(route, Route::CreateGame { .. }));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SessionId;
use crate::protocol::CodeArtifact;
use crate::session::SessionState;
use crate::upstream::EventStream;

/// Phrases that ask for the current game to be published.
const PUBLISH_PHRASES: &[&str] = &["publish", "deploy", "put it online", "make it live"];

/// Phrases that ask for image assets.
const ASSET_PHRASES: &[&str] = &[
    "asset-gen",
    "with graphics",
    "with visuals",
    "with assets",
    "with sprites",
];

/// Where a request goes, with the data that destination needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Generate a new game from scratch.
    CreateGame { prompt: String },
    /// Change the session's current game.
    ModifyGame { prompt: String, game: CodeArtifact },
    /// Deploy the session's current game.
    Publish { game: CodeArtifact },
    /// Generate image assets for a game description.
    GenerateAssets { description: String },
}

impl Route {
    /// The route's discriminant.
    pub fn kind(&self) -> RouteKind {
        match self {
            Route::CreateGame { .. } => RouteKind::CreateGame,
            Route::ModifyGame { .. } => RouteKind::ModifyGame,
            Route::Publish { .. } => RouteKind::Publish,
            Route::GenerateAssets { .. } => RouteKind::GenerateAssets,
        }
    }

    /// Whether this route runs the model and the streaming parser.
    pub fn is_generation(&self) -> bool {
        self.kind().is_generation()
    }
}

/// Discriminant of a [`Route`], used as the dispatch table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    CreateGame,
    ModifyGame,
    Publish,
    GenerateAssets,
}

impl RouteKind {
    /// Whether this route runs the model and the streaming parser.
    pub fn is_generation(self) -> bool {
        matches!(self, RouteKind::CreateGame | RouteKind::ModifyGame)
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::CreateGame => write!(f, "create_game"),
            RouteKind::ModifyGame => write!(f, "modify_game"),
            RouteKind::Publish => write!(f, "publish"),
            RouteKind::GenerateAssets => write!(f, "generate_assets"),
        }
    }
}

/// Decides the route for a request.
///
/// Implementations may consult an LLM or a rule set; the result is always
/// one of the [`Route`] variants.
pub trait RouteClassifier: Send + Sync {
    /// Pick the route for `prompt` given the session's current state.
    fn classify(&self, prompt: &str, session: &SessionState) -> Route;
}

/// Rule-based classifier using fixed keyword lists.
///
/// - A publish phrase with a current game routes to [`Route::Publish`].
/// - An asset phrase routes to [`Route::GenerateAssets`].
/// - Otherwise the request modifies the current game, or creates one when
///   the session has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create the classifier.
    pub fn new() -> Self {
        Self
    }
}

impl RouteClassifier for KeywordClassifier {
    fn classify(&self, prompt: &str, session: &SessionState) -> Route {
        let lowered = prompt.to_lowercase();
        let mentions = |phrases: &[&str]| phrases.iter().any(|p| lowered.contains(p));

        if let Some(game) = session.current_game() {
            if mentions(PUBLISH_PHRASES) {
                return Route::Publish { game: game.clone() };
            }
        }

        if mentions(ASSET_PHRASES) {
            return Route::GenerateAssets {
                description: prompt.to_string(),
            };
        }

        match session.current_game() {
            Some(game) => Route::ModifyGame {
                prompt: prompt.to_string(),
                game: game.clone(),
            },
            None => Route::CreateGame {
                prompt: prompt.to_string(),
            },
        }
    }
}

/// A request handed to a [`RouteHandler`].
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Session the request came from.
    pub session_id: SessionId,
    /// The classified route, carrying its inputs.
    pub route: Route,
}

/// Serves a route outside the built-in generation path.
///
/// The returned events are forwarded to the caller unchanged. An `Err`
/// item ends the turn with an error event.
pub trait RouteHandler: Send + Sync {
    /// Start serving `request`.
    fn handle(&self, request: RouteRequest) -> EventStream;
}

/// Dispatch table from route kind to handler.
#[derive(Clone, Default)]
pub struct RouteTable {
    handlers: HashMap<RouteKind, Arc<dyn RouteHandler>>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for `kind`.
    pub fn insert(&mut self, kind: RouteKind, handler: Arc<dyn RouteHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// The handler registered for `kind`.
    pub fn get(&self, kind: RouteKind) -> Option<&Arc<dyn RouteHandler>> {
        self.handlers.get(&kind)
    }

    /// Whether a handler is registered for `kind`.
    pub fn contains(&self, kind: RouteKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
