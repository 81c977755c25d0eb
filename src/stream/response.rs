//! Turn stream implementation.
//!
//! This module provides [`TurnStream`], which implements [`futures::Stream`]
//! to yield [`GameEvent`]s for one turn. A background task owns the
//! [`StreamingParser`], reads the upstream source and forwards events
//! through a bounded channel.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout as tokio_timeout;

use super::parser::StreamingParser;
use crate::config::TurnConfig;
use crate::observer::EventObserver;
use crate::protocol::{CodeArtifact, GameEvent, Status};
use crate::upstream::{EventStream, TokenStream};
use crate::{Error, Result};

/// How a finished turn ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The artifact from the turn's `code` event, if one was emitted.
    pub artifact: Option<CodeArtifact>,
    /// Message of the last `error` event, if any.
    pub error: Option<String>,
    /// Number of events delivered.
    pub events: usize,
}

impl TurnOutcome {
    /// Check if the turn ended without an error event.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Optional callbacks attached to a turn.
#[derive(Default)]
pub struct TurnHooks {
    /// Sees every event before it is queued for the consumer.
    pub observer: Option<Arc<dyn EventObserver>>,
    /// Receives the outcome once the turn ends. Dropped unsent when the
    /// consumer abandons the stream.
    pub completion: Option<oneshot::Sender<TurnOutcome>>,
}

impl std::fmt::Debug for TurnHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnHooks")
            .field("observer", &self.observer.is_some())
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

/// What the background task reads from.
enum Source {
    /// Model text, classified by a parser.
    Tokens(TokenStream),
    /// Events produced by a route handler, passed through.
    Events(EventStream),
}

/// A stream of events for one turn.
///
/// Errors never surface as `Err` items: an upstream failure or timeout
/// ends the stream with a single [`GameEvent::Error`], after any text
/// sections that were already buffered.
///
/// # Cancellation
///
/// Dropping a `TurnStream` aborts the background task. No outcome is
/// reported for an abandoned turn.
///
/// # Example
///
/// ```ignore
/// use futures::stream::{self, StreamExt};
/// use libmaya::config::TurnConfig;
/// use libmaya::protocol::{GameEvent, Status};
/// use libmaya::stream::TurnStream;
///
/// let tokens = stream::iter(vec![Ok("## Suggestions\nAdd levels".to_string())]).boxed();
/// let events: Vec<_> = TurnStream::generate(tokens, &TurnConfig::default())
///     .collect()
///     .await;
///
/// assert_eq!(events[0], GameEvent::Status(Status::Thinking));
/// assert_eq!(events[2], GameEvent::Suggestions("Add levels".into()));
/// ```
pub struct TurnStream {
    rx: mpsc::Receiver<GameEvent>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TurnStream {
    /// Parse a model token stream into events.
    ///
    /// Must be called within a tokio runtime.
    pub fn generate(tokens: TokenStream, config: &TurnConfig) -> Self {
        Self::generate_with(tokens, config, TurnHooks::default())
    }

    /// Parse a model token stream into events, with hooks.
    pub fn generate_with(tokens: TokenStream, config: &TurnConfig, hooks: TurnHooks) -> Self {
        Self::spawn(Source::Tokens(tokens), config.clone(), hooks)
    }

    /// Pass through events produced by a route handler.
    ///
    /// Only the `thinking` status is added; handlers report their own
    /// progress.
    pub fn forward(events: EventStream, config: &TurnConfig) -> Self {
        Self::forward_with(events, config, TurnHooks::default())
    }

    /// Pass through handler events, with hooks.
    pub fn forward_with(events: EventStream, config: &TurnConfig, hooks: TurnHooks) -> Self {
        Self::spawn(Source::Events(events), config.clone(), hooks)
    }

    fn spawn(source: Source, config: TurnConfig, hooks: TurnHooks) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity());

        let TurnHooks {
            observer,
            completion,
        } = hooks;

        let task_handle = tokio::spawn(async move {
            let mut sink = EventSink::new(tx, observer.clone());

            let result = match source {
                Source::Tokens(tokens) => Self::run_tokens(tokens, &config, &mut sink).await,
                Source::Events(events) => Self::run_events(events, &config, &mut sink).await,
            };

            match result {
                Ok(()) => {}
                Err(Error::Cancelled) => {
                    tracing::debug!("turn consumer dropped the stream");
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "turn failed");
                    if sink.emit(GameEvent::error(err.user_message())).await.is_err() {
                        return;
                    }
                }
            }

            let outcome = sink.into_outcome();
            if let Some(ref obs) = observer {
                obs.on_turn_complete(&outcome);
            }
            if let Some(completion) = completion {
                // Receiver gone means nobody is tracking this turn.
                let _ = completion.send(outcome);
            }
        });

        Self {
            rx,
            task_handle: Some(task_handle),
        }
    }

    /// Drive a parser over the token source.
    async fn run_tokens(
        mut tokens: TokenStream,
        config: &TurnConfig,
        sink: &mut EventSink,
    ) -> Result<()> {
        let mut parser = StreamingParser::with_threshold(config.section_threshold());

        if config.emit_status() {
            sink.emit(GameEvent::Status(Status::Thinking)).await?;
            sink.emit(GameEvent::Status(Status::Generating)).await?;
        }

        loop {
            match next_item(&mut tokens, config.timeout()).await {
                Ok(Some(token)) => {
                    for event in parser.process_token(&token) {
                        sink.emit(event).await?;
                    }
                }
                Ok(None) => {
                    for event in parser.finalize() {
                        sink.emit(event).await?;
                    }
                    return Ok(());
                }
                Err(err) => {
                    // Buffered text is flushed; partial code is dropped.
                    for event in parser.abort() {
                        sink.emit(event).await?;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Forward handler events unchanged.
    async fn run_events(
        mut events: EventStream,
        config: &TurnConfig,
        sink: &mut EventSink,
    ) -> Result<()> {
        if config.emit_status() {
            sink.emit(GameEvent::Status(Status::Thinking)).await?;
        }

        while let Some(event) = next_item(&mut events, config.timeout()).await? {
            sink.emit(event).await?;
        }
        Ok(())
    }

    /// Collect all events from the stream.
    pub async fn collect_all(mut self) -> CollectedTurn {
        let mut turn = CollectedTurn::default();

        while let Some(event) = self.next().await {
            match &event {
                GameEvent::Explanation(text) => turn.explanation = Some(text.clone()),
                GameEvent::Code(artifact) => turn.artifact = Some(artifact.clone()),
                GameEvent::Features(text) => turn.features = Some(text.clone()),
                GameEvent::Suggestions(text) => turn.suggestions = Some(text.clone()),
                GameEvent::Error(message) => turn.error = Some(message.clone()),
                GameEvent::Status(_) | GameEvent::CodeChunk(_) => {}
            }
            turn.events.push(event);
        }

        turn
    }
}

impl Stream for TurnStream {
    type Item = GameEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnStream")
            .field("running", &self.task_handle.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Delivers events to the observer and the channel, tracking the outcome.
struct EventSink {
    tx: mpsc::Sender<GameEvent>,
    observer: Option<Arc<dyn EventObserver>>,
    artifact: Option<CodeArtifact>,
    error: Option<String>,
    events: usize,
}

impl EventSink {
    fn new(tx: mpsc::Sender<GameEvent>, observer: Option<Arc<dyn EventObserver>>) -> Self {
        Self {
            tx,
            observer,
            artifact: None,
            error: None,
            events: 0,
        }
    }

    async fn emit(&mut self, event: GameEvent) -> Result<()> {
        if let Some(ref obs) = self.observer {
            obs.on_event(&event);
        }
        match &event {
            GameEvent::Code(artifact) => self.artifact = Some(artifact.clone()),
            GameEvent::Error(message) => self.error = Some(message.clone()),
            _ => {}
        }
        self.events += 1;

        self.tx.send(event).await.map_err(|_| Error::Cancelled)
    }

    fn into_outcome(self) -> TurnOutcome {
        TurnOutcome {
            artifact: self.artifact,
            error: self.error,
            events: self.events,
        }
    }
}

/// Next item of an upstream stream, bounded by the turn timeout.
async fn next_item<T>(
    stream: &mut futures::stream::BoxStream<'static, Result<T>>,
    timeout: Option<Duration>,
) -> Result<Option<T>> {
    let item = match timeout {
        Some(duration) => with_timeout(duration, async { Ok(stream.next().await) }).await?,
        None => stream.next().await,
    };
    item.transpose()
}

/// Run a future with a timeout.
///
/// Returns an error if the future doesn't complete within the specified duration.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio_timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(duration)),
    }
}

/// Everything a finished turn produced.
#[derive(Debug, Clone, Default)]
pub struct CollectedTurn {
    /// All events in order.
    pub events: Vec<GameEvent>,
    /// The game artifact.
    pub artifact: Option<CodeArtifact>,
    /// Last explanation text.
    pub explanation: Option<String>,
    /// Last features text.
    pub features: Option<String>,
    /// Last suggestions text.
    pub suggestions: Option<String>,
    /// Error message, if the turn failed.
    pub error: Option<String>,
}

impl CollectedTurn {
    /// Check if the turn ended without an error event.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of `code` events in the turn.
    pub fn code_events(&self) -> usize {
        self.events.iter().filter(|e| e.as_code().is_some()).count()
    }
}
