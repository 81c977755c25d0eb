//! Test utilities for libmaya integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::stream::{self, StreamExt};
use libmaya::protocol::GameEvent;
use libmaya::routing::{RouteHandler, RouteRequest};
use libmaya::upstream::{EventStream, GenerationRequest, Generator, TokenStream};
use libmaya::{Error, Result};

/// A mock generator that replays pre-defined token scripts.
///
/// Each call to `generate` consumes the next script; once they run out,
/// the last one is repeated. Requests are recorded for inspection.
pub struct MockGenerator {
    scripts: Mutex<VecDeque<Vec<Result<String>>>>,
    last: Mutex<Vec<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    /// Create a generator that answers every request with `tokens`.
    pub fn new(tokens: Vec<String>) -> Self {
        Self::with_scripts(vec![tokens])
    }

    /// Create a generator that answers successive requests with successive
    /// scripts.
    pub fn with_scripts(scripts: Vec<Vec<String>>) -> Self {
        let last = scripts.last().cloned().unwrap_or_default();
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|s| s.into_iter().map(Ok).collect())
                    .collect(),
            ),
            last: Mutex::new(last),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a generator whose stream fails after `tokens`.
    pub fn with_error(tokens: Vec<String>, error: Error) -> Self {
        let mut script: Vec<Result<String>> = tokens.into_iter().map(Ok).collect();
        script.push(Err(error));
        Self {
            scripts: Mutex::new(VecDeque::from(vec![script])),
            last: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Generator for MockGenerator {
    fn generate(&self, request: GenerationRequest) -> TokenStream {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().iter().cloned().map(Ok).collect());
        stream::iter(script).boxed()
    }
}

/// A generator that never yields a token.
pub struct StalledGenerator;

impl Generator for StalledGenerator {
    fn generate(&self, _request: GenerationRequest) -> TokenStream {
        stream::pending::<Result<String>>().boxed()
    }
}

/// A route handler that replays fixed events and records requests.
pub struct MockHandler {
    events: Vec<GameEvent>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl MockHandler {
    pub fn new(events: Vec<GameEvent>) -> Self {
        Self {
            events,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl RouteHandler for MockHandler {
    fn handle(&self, request: RouteRequest) -> EventStream {
        self.requests.lock().unwrap().push(request);
        stream::iter(self.events.clone().into_iter().map(Ok).collect::<Vec<_>>()).boxed()
    }
}

/// Builder for realistic model responses.
///
/// Sections are appended in call order, so out-of-order or missing
/// sections can be scripted too.
pub struct ScenarioBuilder {
    text: String,
}

impl ScenarioBuilder {
    /// Create a new scenario builder.
    pub fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    /// Add an explanation section.
    pub fn explanation(mut self, text: &str) -> Self {
        self.text.push_str("## Building Your Game\n");
        self.text.push_str(text);
        self.text.push_str("\n\n");
        self
    }

    /// Add an explanation section using the modification heading.
    pub fn update_explanation(mut self, text: &str) -> Self {
        self.text.push_str("## Updating Your Game\n");
        self.text.push_str(text);
        self.text.push_str("\n\n");
        self
    }

    /// Add a complete fenced HTML block.
    pub fn code(mut self, html: &str) -> Self {
        self.text.push_str("```html\n");
        self.text.push_str(html);
        self.text.push_str("\n```\n\n");
        self
    }

    /// Add an HTML block whose closing fence never arrives.
    pub fn unterminated_code(mut self, html: &str) -> Self {
        self.text.push_str("```html\n");
        self.text.push_str(html);
        self
    }

    /// Add a features section.
    pub fn features(mut self, text: &str) -> Self {
        self.text.push_str("## Game Features\n");
        self.text.push_str(text);
        self.text.push_str("\n\n");
        self
    }

    /// Add a suggestions section.
    pub fn suggestions(mut self, text: &str) -> Self {
        self.text.push_str("## Suggested Modifications\n");
        self.text.push_str(text);
        self.text.push('\n');
        self
    }

    /// Add free text with no heading.
    pub fn raw(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    /// The full response text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The response split into tokens of `chunk` characters
    /// (respecting UTF-8 boundaries).
    pub fn tokens(&self, chunk: usize) -> Vec<String> {
        let chars: Vec<char> = self.text.chars().collect();
        chars.chunks(chunk).map(|c| c.iter().collect()).collect()
    }

    /// A token stream of `chunk`-character tokens.
    pub fn stream(&self, chunk: usize) -> TokenStream {
        let tokens: Vec<Result<String>> = self.tokens(chunk).into_iter().map(Ok).collect();
        stream::iter(tokens).boxed()
    }

    /// A generator replaying this response in 10-character tokens.
    pub fn generator(&self) -> MockGenerator {
        MockGenerator::new(self.tokens(10))
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The canonical snake game response.
pub fn snake_game() -> ScenarioBuilder {
    ScenarioBuilder::new()
        .explanation("A snake game.")
        .code("<html></html>")
        .features("Move with arrows.")
}

/// A long response with every section, for chunking tests.
pub fn full_game() -> ScenarioBuilder {
    let mut features = String::new();
    for i in 0..15 {
        features.push_str(&format!("- Feature {i}: the player can do something new\n"));
    }
    let mut suggestions = String::new();
    for i in 0..10 {
        suggestions.push_str(&format!("- Idea {i}: add a twist to keep it fresh\n"));
    }

    ScenarioBuilder::new()
        .explanation("A breakout clone with power-ups.\nBricks take several hits.")
        .code(
            "<!DOCTYPE html>\n<html>\n<head><style>canvas { border: 1px solid; }</style></head>\n\
             <body><canvas id=\"c\"></canvas><script>\n// ## Game Features live in code too\n\
             const ctx = document.getElementById('c').getContext('2d');\n</script></body>\n</html>",
        )
        .features(features.trim_end())
        .suggestions(suggestions.trim_end())
}
