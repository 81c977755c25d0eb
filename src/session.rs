//! Per-session conversation state.
//!
//! This module provides [`SessionState`], which holds one user's
//! conversation history, current game and asset quota, and
//! [`SessionStore`], the shared map of sessions a client works against.
//!
//! Sessions change only at turn boundaries: the user turn is recorded
//! when a turn starts and the assistant turn when its outcome arrives.
//!
//! # Example
//!
//! ```ignore
//! use libmaya::session::SessionStore;
//!
//! let store = SessionStore::new(1);
//! let state = store.get_or_create(&session_id).await;
//! println!("{} turns so far", state.history().len());
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::config::SessionId;
use crate::protocol::{CodeArtifact, ConversationTurn};
use crate::quota::AssetQuota;
use crate::routing::RouteKind;
use crate::stream::TurnOutcome;
use crate::{Error, Result};

/// Assistant text recorded after a turn that produced a game.
pub const GENERATED_MESSAGE: &str = "Generated game successfully";
/// Assistant text recorded after a generation turn with no code.
pub const NO_CODE_MESSAGE: &str = "Response contained no game code";
/// Assistant text recorded after assets were generated.
pub const ASSETS_MESSAGE: &str = "Generated game assets";
/// Assistant text recorded after the game was published.
pub const PUBLISHED_MESSAGE: &str = "Published game";
/// Assistant text recorded when the consumer abandoned the turn.
pub const CANCELLED_MESSAGE: &str = "Turn cancelled";

/// One user's conversation state.
#[derive(Debug, Clone)]
pub struct SessionState {
    history: Vec<ConversationTurn>,
    current_game: Option<CodeArtifact>,
    quota: AssetQuota,
    assets_ready: bool,
    created_at: DateTime<Utc>,
}

impl SessionState {
    /// A fresh session allowing `asset_limit` asset generations.
    pub fn new(asset_limit: u32) -> Self {
        Self {
            history: Vec::new(),
            current_game: None,
            quota: AssetQuota::new(asset_limit),
            assets_ready: false,
            created_at: Utc::now(),
        }
    }

    /// Conversation turns in the order they happened.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The most recent game artifact, if any turn produced one.
    pub fn current_game(&self) -> Option<&CodeArtifact> {
        self.current_game.as_ref()
    }

    /// Replace the session's current game.
    pub fn set_current_game(&mut self, game: CodeArtifact) {
        self.current_game = Some(game);
    }

    /// Whether generated assets exist for this session.
    pub fn has_assets(&self) -> bool {
        self.assets_ready
    }

    /// The session's asset generation allowance.
    pub fn quota(&self) -> &AssetQuota {
        &self.quota
    }

    pub(crate) fn quota_mut(&mut self) -> &mut AssetQuota {
        &mut self.quota
    }

    /// When the session was first seen.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append the user's request.
    pub fn record_user(&mut self, prompt: &str) {
        self.history.push(ConversationTurn::user(prompt));
    }

    /// Append the assistant turn for a finished turn and update derived
    /// state.
    ///
    /// A failed turn records its error message and leaves the current game
    /// untouched.
    pub fn apply_outcome(&mut self, route: RouteKind, outcome: &TurnOutcome) {
        if let Some(ref error) = outcome.error {
            self.history
                .push(ConversationTurn::assistant(error.clone(), None));
            return;
        }

        let turn = match route {
            RouteKind::CreateGame | RouteKind::ModifyGame => match outcome.artifact {
                Some(ref artifact) => {
                    self.set_current_game(artifact.clone());
                    ConversationTurn::assistant(GENERATED_MESSAGE, Some(artifact.html.clone()))
                }
                None => ConversationTurn::assistant(NO_CODE_MESSAGE, None),
            },
            RouteKind::GenerateAssets => {
                self.assets_ready = true;
                ConversationTurn::assistant(ASSETS_MESSAGE, None)
            }
            RouteKind::Publish => ConversationTurn::assistant(PUBLISHED_MESSAGE, None),
        };
        self.history.push(turn);
    }

    /// Append the assistant turn for an abandoned turn.
    pub fn record_cancelled(&mut self) {
        self.history
            .push(ConversationTurn::assistant(CANCELLED_MESSAGE, None));
    }
}

/// Shared map of sessions.
///
/// # Thread Safety
///
/// `SessionStore` is `Send + Sync`. Every access takes an async lock for
/// the duration of one closure, so updates to one session never
/// interleave.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, SessionState>>,
    asset_limit: u32,
}

impl SessionStore {
    /// Create an empty store whose sessions allow `asset_limit` asset
    /// generations each.
    pub fn new(asset_limit: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            asset_limit,
        }
    }

    /// Snapshot of a session, creating it if needed.
    pub async fn get_or_create(&self, id: &SessionId) -> SessionState {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "creating session");
                SessionState::new(self.asset_limit)
            })
            .clone()
    }

    /// Snapshot of an existing session.
    pub async fn snapshot(&self, id: &SessionId) -> Result<SessionState> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound { id: id.to_string() })
    }

    /// Run `f` against an existing session under the store lock.
    pub async fn update<F, R>(&self, id: &SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        let mut sessions = self.sessions.lock().await;
        let state = sessions
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound { id: id.to_string() })?;
        Ok(f(state))
    }

    /// Apply a finished turn's outcome to a session.
    pub async fn record_outcome(
        &self,
        id: &SessionId,
        route: RouteKind,
        outcome: &TurnOutcome,
    ) -> Result<()> {
        self.update(id, |state| state.apply_outcome(route, outcome))
            .await
    }

    /// Drop a session, returning its final state.
    pub async fn remove(&self, id: &SessionId) -> Option<SessionState> {
        self.sessions.lock().await.remove(id)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
