//! High-level orchestration client.
//!
//! This module provides [`GameClient`], the main entry point. A client
//! routes each request, runs the model through the streaming parser or
//! hands the request to a registered [`RouteHandler`], and updates the
//! session once the turn ends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use libmaya::{GameClient, GameEvent, Result};
//!
//! async fn run(generator: Arc<dyn libmaya::Generator>) -> Result<()> {
//!     let client = GameClient::builder(generator).build()?;
//!     let session = client.create_session().await;
//!
//!     let mut stream = client.send(&session, "a snake game").await?;
//!     while let Some(event) = stream.next().await {
//!         println!("{}", event.to_sse()?);
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::{SessionId, TurnConfig};
use crate::observer::EventObserver;
use crate::routing::{KeywordClassifier, Route, RouteClassifier, RouteHandler, RouteKind, RouteRequest, RouteTable};
use crate::session::{SessionState, SessionStore};
use crate::stream::{CollectedTurn, TurnHooks, TurnOutcome, TurnStream};
use crate::upstream::{GenerationRequest, Generator};
use crate::{Error, Result};

/// Client that turns user requests into event streams.
///
/// # Thread Safety
///
/// `GameClient` is `Send + Sync` and cheap to clone; clones share the
/// same session store. Concurrent turns for different sessions run
/// independently.
#[derive(Clone)]
pub struct GameClient {
    config: Arc<TurnConfig>,
    generator: Arc<dyn Generator>,
    classifier: Arc<dyn RouteClassifier>,
    routes: Arc<RouteTable>,
    observer: Option<Arc<dyn EventObserver>>,
    sessions: Arc<SessionStore>,
}

impl GameClient {
    /// Create a builder around the generator that produces model output.
    pub fn builder(generator: Arc<dyn Generator>) -> GameClientBuilder {
        GameClientBuilder::new(generator)
    }

    /// Start a new, empty session.
    pub async fn create_session(&self) -> SessionId {
        let id = SessionId::generate();
        self.sessions.get_or_create(&id).await;
        id
    }

    /// Route a request and return its event stream.
    ///
    /// Unknown session ids are created on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::NoHandler`] when the chosen route has no handler
    /// - [`Error::QuotaExceeded`] when an asset request exceeds the
    ///   session's allowance
    ///
    /// Failures after the stream starts arrive as an `error` event.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned [`TurnStream`] cancels the turn; the session
    /// records it as cancelled.
    pub async fn send(&self, session_id: &SessionId, prompt: &str) -> Result<TurnStream> {
        let (stream, _tracker) = self.start_turn(session_id, prompt).await?;
        Ok(stream)
    }

    /// Route a request and collect everything the turn produced.
    ///
    /// The session is updated before this returns.
    pub async fn send_and_collect(
        &self,
        session_id: &SessionId,
        prompt: &str,
    ) -> Result<CollectedTurn> {
        let (stream, tracker) = self.start_turn(session_id, prompt).await?;
        let turn = stream.collect_all().await;

        if let Err(err) = tracker.await {
            tracing::warn!(session_id = %session_id, error = %err, "session tracker failed");
        }
        Ok(turn)
    }

    /// Snapshot of a session.
    pub async fn session(&self, session_id: &SessionId) -> Result<SessionState> {
        self.sessions.snapshot(session_id).await
    }

    /// Forget a session.
    pub async fn end_session(&self, session_id: &SessionId) -> Result<()> {
        self.sessions
            .remove(session_id)
            .await
            .map(|_| ())
            .ok_or_else(|| Error::SessionNotFound {
                id: session_id.to_string(),
            })
    }

    /// Get a reference to the client's configuration.
    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    async fn start_turn(
        &self,
        session_id: &SessionId,
        prompt: &str,
    ) -> Result<(TurnStream, JoinHandle<()>)> {
        let state = self.sessions.get_or_create(session_id).await;
        let route = self.classifier.classify(prompt, &state);
        let kind = route.kind();

        tracing::debug!(session_id = %session_id, route = %kind, "routing request");

        let handler = if route.is_generation() {
            None
        } else {
            let handler = self
                .routes
                .get(kind)
                .cloned()
                .ok_or(Error::NoHandler { route: kind })?;
            Some(handler)
        };

        if kind == RouteKind::GenerateAssets {
            self.sessions
                .update(session_id, |s| s.quota_mut().try_acquire())
                .await??;
        }

        self.sessions
            .update(session_id, |s| s.record_user(prompt))
            .await?;

        let (tx, rx) = oneshot::channel();
        let hooks = TurnHooks {
            observer: self.observer.clone(),
            completion: Some(tx),
        };

        let stream = match route {
            Route::CreateGame { prompt } => {
                let request = GenerationRequest::new(prompt).with_assets(state.has_assets());
                self.generate(request, hooks)
            }
            Route::ModifyGame { prompt, game } => {
                let request = GenerationRequest::new(prompt)
                    .with_previous_game(game)
                    .with_assets(state.has_assets());
                self.generate(request, hooks)
            }
            route => {
                let handler = handler.ok_or(Error::NoHandler { route: kind })?;
                let request = RouteRequest {
                    session_id: session_id.clone(),
                    route,
                };
                TurnStream::forward_with(handler.handle(request), &self.config, hooks)
            }
        };

        let tracker = self.track(session_id.clone(), kind, rx);
        Ok((stream, tracker))
    }

    fn generate(&self, request: GenerationRequest, hooks: TurnHooks) -> TurnStream {
        tracing::debug!(
            modification = request.is_modification(),
            instructions = %request.instruction_variant(),
            "starting generation"
        );
        TurnStream::generate_with(self.generator.generate(request), &self.config, hooks)
    }

    /// Apply the turn's outcome to its session once it arrives.
    fn track(
        &self,
        session_id: SessionId,
        route: RouteKind,
        outcome: oneshot::Receiver<TurnOutcome>,
    ) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);

        tokio::spawn(async move {
            let result = match outcome.await {
                Ok(outcome) => {
                    tracing::debug!(
                        session_id = %session_id,
                        route = %route,
                        success = outcome.is_success(),
                        "turn finished"
                    );
                    sessions.record_outcome(&session_id, route, &outcome).await
                }
                Err(_) => {
                    tracing::debug!(session_id = %session_id, route = %route, "turn cancelled");
                    sessions
                        .update(&session_id, |s| s.record_cancelled())
                        .await
                }
            };

            if let Err(err) = result {
                tracing::warn!(session_id = %session_id, error = %err, "could not record turn");
            }
        })
    }
}

impl fmt::Debug for GameClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameClient")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`GameClient`].
///
/// # Example
///
/// ```ignore
/// let client = GameClient::builder(generator)
///     .config(TurnConfig::builder().timeout(Duration::from_secs(120)).build()?)
///     .handler(RouteKind::Publish, Arc::new(FirebasePublisher::new()))
///     .observer(Arc::new(LoggingObserver::new()))
///     .build()?;
/// ```
pub struct GameClientBuilder {
    generator: Arc<dyn Generator>,
    config: TurnConfig,
    classifier: Arc<dyn RouteClassifier>,
    routes: RouteTable,
    observer: Option<Arc<dyn EventObserver>>,
}

impl GameClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            config: TurnConfig::default(),
            classifier: Arc::new(KeywordClassifier::new()),
            routes: RouteTable::new(),
            observer: None,
        }
    }

    /// Use a validated turn configuration.
    pub fn config(mut self, config: TurnConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the keyword classifier.
    pub fn classifier(mut self, classifier: Arc<dyn RouteClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Register the handler for a non-generation route.
    pub fn handler(mut self, kind: RouteKind, handler: Arc<dyn RouteHandler>) -> Self {
        self.routes.insert(kind, handler);
        self
    }

    /// Set an observer for every emitted event.
    pub fn observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a handler was registered for a
    /// generation route, which the client always serves itself.
    pub fn build(self) -> Result<GameClient> {
        for kind in [RouteKind::CreateGame, RouteKind::ModifyGame] {
            if self.routes.contains(kind) {
                return Err(Error::InvalidConfig(format!(
                    "route {} is served by the generator and cannot take a handler",
                    kind
                )));
            }
        }

        let sessions = SessionStore::new(self.config.asset_generations_per_session());

        Ok(GameClient {
            config: Arc::new(self.config),
            generator: self.generator,
            classifier: self.classifier,
            routes: Arc::new(self.routes),
            observer: self.observer,
            sessions: Arc::new(sessions),
        })
    }
}

impl fmt::Debug for GameClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameClientBuilder")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}
