//! Incremental section parser for streamed model output.
//!
//! [`StreamingParser`] consumes text fragments of any size and turns them
//! into [`GameEvent`]s as section boundaries and thresholds are crossed.
//! It depends only on the cumulative buffer, never on where one fragment
//! ends and the next begins, so any chunking of the same response yields
//! the same final section text and the same artifact.

use crate::protocol::{CodeArtifact, GameEvent};

use super::sections::{find_code_close, Marker, ParseState, SectionMatcher, CODE_FENCE};

/// Growth in characters a features or suggestions section must reach
/// before another batched event is emitted.
pub const DEFAULT_SECTION_THRESHOLD: usize = 200;

/// State machine that classifies one turn's output into structured events.
///
/// One parser per turn. Feed fragments with
/// [`process_token`](Self::process_token) and call
/// [`finalize`](Self::finalize) once the upstream stream ends, or
/// [`abort`](Self::abort) when it fails.
///
/// # Guarantees
///
/// - At most one [`GameEvent::Code`] per turn, even if the closing fence
///   never arrives.
/// - Explanation, features and suggestions are never re-emitted with
///   identical text.
/// - `finalize` and `abort` are idempotent.
///
/// # Example
///
/// ```
/// use libmaya::protocol::GameEvent;
/// use libmaya::stream::StreamingParser;
///
/// let mut parser = StreamingParser::new();
/// let mut events = Vec::new();
/// for token in ["## Building Your Game\nPong.\n", "```html\n<html></html>\n```\n"] {
///     events.extend(parser.process_token(token));
/// }
/// events.extend(parser.finalize());
///
/// assert_eq!(events[0], GameEvent::Explanation("Pong.".into()));
/// assert_eq!(events[1], GameEvent::CodeChunk("<html></html>".into()));
/// assert!(matches!(events[2], GameEvent::Code(_)));
/// ```
#[derive(Debug, Clone)]
pub struct StreamingParser {
    threshold: usize,
    buffer: String,
    state: ParseState,
    /// Start of the region the matcher scans. Moves past the closing fence.
    scan_from: usize,
    /// Where the active section's content begins.
    section_start: usize,
    /// Last text emitted for the active section.
    section_emitted: Option<String>,
    /// Section length in chars at the last batched emission.
    emitted_chars: usize,
    /// Where to resume looking for the closing fence.
    fence_search_from: usize,
    html_code_complete: bool,
    artifact: Option<CodeArtifact>,
    finished: bool,
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingParser {
    /// Create a parser with the default 200-character batching threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_SECTION_THRESHOLD)
    }

    /// Create a parser with a custom batching threshold for features and
    /// suggestions.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold,
            buffer: String::new(),
            state: ParseState::Waiting,
            scan_from: 0,
            section_start: 0,
            section_emitted: None,
            emitted_chars: 0,
            fence_search_from: 0,
            html_code_complete: false,
            artifact: None,
            finished: false,
        }
    }

    /// The currently active section.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Everything received so far this turn.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether the turn's code event has been emitted.
    pub fn is_code_complete(&self) -> bool {
        self.html_code_complete
    }

    /// Whether `finalize` or `abort` has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The artifact carried by the emitted code event, if any.
    pub fn artifact(&self) -> Option<&CodeArtifact> {
        self.artifact.as_ref()
    }

    /// Append a fragment and return the events it produced, in order.
    pub fn process_token(&mut self, token: &str) -> Vec<GameEvent> {
        if self.finished {
            tracing::warn!(len = token.len(), "token received after parser finished; ignoring");
            return Vec::new();
        }

        self.buffer.push_str(token);

        let mut events = Vec::new();
        loop {
            self.advance_state(&mut events);
            // A closing fence moves the scan region; markers after it may
            // already be in the buffer.
            if !self.process_current(&mut events) {
                break;
            }
        }
        events
    }

    /// Flush the active section and complete an unterminated code block.
    ///
    /// Call once when the upstream stream ends. Later calls return nothing.
    pub fn finalize(&mut self) -> Vec<GameEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut events = Vec::new();
        self.flush_section(self.buffer.len(), &mut events);

        if self.state == ParseState::CodeBlock && !self.html_code_complete {
            let body = self.buffer.get(self.section_start..).unwrap_or_default();
            let html = unterminated_code(body);
            tracing::debug!(len = html.len(), "completing unterminated code block");
            self.complete_code(html, &mut events);
        }

        events
    }

    /// Flush buffered text sections without synthesizing a code event.
    ///
    /// Used when the upstream stream failed; a half-written game is not
    /// presented as an artifact. Marks the parser finished.
    pub fn abort(&mut self) -> Vec<GameEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut events = Vec::new();
        self.flush_section(self.buffer.len(), &mut events);
        events
    }

    fn matcher(&self) -> SectionMatcher {
        if self.html_code_complete {
            SectionMatcher::without_code_fence()
        } else {
            SectionMatcher::new()
        }
    }

    /// Priority of the active state for transition decisions. A closed code
    /// block no longer holds the parser.
    fn current_rank(&self) -> u8 {
        if self.state == ParseState::CodeBlock && self.html_code_complete {
            ParseState::Waiting.priority()
        } else {
            self.state.priority()
        }
    }

    fn advance_state(&mut self, events: &mut Vec<GameEvent>) {
        let markers = self.matcher().scan(&self.buffer, self.scan_from);
        let Some(target) = markers.first().copied() else {
            return;
        };
        if target.state.priority() <= self.current_rank() {
            return;
        }

        // Lower-priority markers that a single large fragment carried in
        // front of the target are visited in buffer order, as they would
        // have been had the text arrived one character at a time.
        let mut passed: Vec<Marker> = markers[1..]
            .iter()
            .filter(|m| m.start >= self.section_start && m.end <= target.start)
            .copied()
            .collect();
        passed.sort_by_key(|m| m.start);

        for marker in passed {
            if marker.state.priority() > self.current_rank() {
                self.enter(marker, events);
            }
        }
        self.enter(target, events);
    }

    fn enter(&mut self, marker: Marker, events: &mut Vec<GameEvent>) {
        self.flush_section(marker.start, events);

        tracing::debug!(
            from = ?self.state,
            to = ?marker.state,
            offset = marker.end,
            "section transition"
        );

        self.state = marker.state;
        self.section_start = marker.end;
        self.section_emitted = None;
        self.emitted_chars = 0;
        if marker.state == ParseState::CodeBlock {
            self.fence_search_from = marker.end;
        }
    }

    /// Emit the active text section bounded at `end`, unless it is empty or
    /// identical to what was already sent.
    fn flush_section(&mut self, end: usize, events: &mut Vec<GameEvent>) {
        if !matches!(
            self.state,
            ParseState::Explanation | ParseState::Features | ParseState::Suggestions
        ) {
            return;
        }

        let text = self
            .buffer
            .get(self.section_start..end)
            .unwrap_or_default()
            .trim();
        if text.is_empty() || self.section_emitted.as_deref() == Some(text) {
            return;
        }

        let text = text.to_string();
        if let Some(event) = section_event(self.state, text.clone()) {
            events.push(event);
        }
        self.section_emitted = Some(text);
    }

    /// Run the active state's processor. Returns true when the scan region
    /// moved and detection should run again.
    fn process_current(&mut self, events: &mut Vec<GameEvent>) -> bool {
        match self.state {
            // Explanation text is held until a later marker bounds it; the
            // transition flush emits it.
            ParseState::Waiting | ParseState::Explanation => false,
            ParseState::CodeBlock => self.process_code(events),
            ParseState::Features | ParseState::Suggestions => {
                self.process_batched(events);
                false
            }
        }
    }

    fn process_code(&mut self, events: &mut Vec<GameEvent>) -> bool {
        if self.html_code_complete {
            return false;
        }

        let Some(close) = find_code_close(&self.buffer, self.fence_search_from) else {
            // A fence split across fragments must still be found next time.
            let mut resume = self
                .buffer
                .len()
                .saturating_sub(CODE_FENCE.len() - 1)
                .max(self.section_start);
            while !self.buffer.is_char_boundary(resume) {
                resume -= 1;
            }
            self.fence_search_from = resume;
            return false;
        };

        let code = self.buffer[self.section_start..close].trim().to_string();
        if !code.is_empty() {
            events.push(GameEvent::CodeChunk(code.clone()));
        }
        self.complete_code(code, events);

        let fence_end = close + CODE_FENCE.len();
        self.scan_from = fence_end;
        self.section_start = fence_end;
        true
    }

    fn complete_code(&mut self, html: String, events: &mut Vec<GameEvent>) {
        if self.html_code_complete {
            return;
        }
        let artifact = CodeArtifact::from_html(html);
        tracing::debug!(len = artifact.html.len(), "code block complete");
        events.push(GameEvent::Code(artifact.clone()));
        self.artifact = Some(artifact);
        self.html_code_complete = true;
    }

    fn process_batched(&mut self, events: &mut Vec<GameEvent>) {
        let section = self.buffer.get(self.section_start..).unwrap_or_default();
        let chars = section.chars().count();
        if chars <= self.emitted_chars + self.threshold {
            return;
        }

        tracing::trace!(state = ?self.state, chars, "section crossed batching threshold");
        self.emitted_chars = chars;

        let text = section.trim();
        if text.is_empty() || self.section_emitted.as_deref() == Some(text) {
            return;
        }
        let text = text.to_string();
        if let Some(event) = section_event(self.state, text.clone()) {
            events.push(event);
        }
        self.section_emitted = Some(text);
    }
}

fn section_event(state: ParseState, text: String) -> Option<GameEvent> {
    match state {
        ParseState::Explanation => Some(GameEvent::Explanation(text)),
        ParseState::Features => Some(GameEvent::Features(text)),
        ParseState::Suggestions => Some(GameEvent::Suggestions(text)),
        ParseState::Waiting | ParseState::CodeBlock => None,
    }
}

/// Code body of a block whose closing fence never arrived, minus a
/// partial fence of one or two backticks on its own last line.
fn unterminated_code(body: &str) -> String {
    let body = body.trim_end();
    let without_ticks = body.trim_end_matches('`');
    let ticks = body.len() - without_ticks.len();
    let line_start = without_ticks.trim_end_matches([' ', '\t']);
    if (1..=2).contains(&ticks) && (line_start.is_empty() || line_start.ends_with('\n')) {
        without_ticks.trim().to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventType;

    const SNAKE: &str = "## Building Your Game\nA snake game.\n```html\n<html></html>\n```\n## Game Features\nMove with arrows.\n";

    fn feed_chunks(parser: &mut StreamingParser, text: &str, size: usize) -> Vec<GameEvent> {
        let chars: Vec<char> = text.chars().collect();
        let mut events = Vec::new();
        for chunk in chars.chunks(size) {
            let token: String = chunk.iter().collect();
            events.extend(parser.process_token(&token));
        }
        events
    }

    fn run(text: &str, size: usize) -> Vec<GameEvent> {
        let mut parser = StreamingParser::new();
        let mut events = feed_chunks(&mut parser, text, size);
        events.extend(parser.finalize());
        events
    }

    fn code_events(events: &[GameEvent]) -> Vec<&CodeArtifact> {
        events.iter().filter_map(GameEvent::as_code).collect()
    }

    fn last_text(events: &[GameEvent], kind: EventType) -> Option<String> {
        events
            .iter()
            .rev()
            .find(|e| e.event_type() == kind)
            .and_then(|e| e.text().map(str::to_string))
    }

    #[test]
    fn snake_scenario_character_chunks() {
        let events = run(SNAKE, 1);
        assert_eq!(
            events,
            vec![
                GameEvent::Explanation("A snake game.".into()),
                GameEvent::CodeChunk("<html></html>".into()),
                GameEvent::Code(CodeArtifact::from_html("<html></html>")),
                GameEvent::Features("Move with arrows.".into()),
            ]
        );
    }

    #[test]
    fn snake_scenario_three_tokens() {
        let mut parser = StreamingParser::new();
        let mut events = Vec::new();
        events.extend(parser.process_token("## Building Your Game\nA snake game.\n"));
        events.extend(parser.process_token("```html\n<html></html>\n```\n"));
        events.extend(parser.process_token("## Game Features\nMove with arrows.\n"));
        events.extend(parser.finalize());
        assert_eq!(events, run(SNAKE, 1));
    }

    #[test]
    fn whole_response_in_one_token() {
        assert_eq!(run(SNAKE, SNAKE.len()), run(SNAKE, 1));
    }

    #[test]
    fn unterminated_code_block_completes_at_finalize() {
        let mut parser = StreamingParser::new();
        let during = feed_chunks(&mut parser, "```html\n<html><body>Hi</body></html>", 1);
        assert!(during.is_empty(), "partial code must not be emitted");

        let events = parser.finalize();
        assert_eq!(
            events,
            vec![GameEvent::Code(CodeArtifact::from_html(
                "<html><body>Hi</body></html>"
            ))]
        );
        assert!(parser.is_code_complete());
    }

    #[test]
    fn dangling_partial_fence_is_dropped() {
        let events = run("```html\n<p>x</p>\n``", 3);
        assert_eq!(code_events(&events)[0].html, "<p>x</p>");
    }

    #[test]
    fn trailing_template_literal_is_kept() {
        let events = run("```html\n<script>let s = `hi`", 1);
        assert_eq!(code_events(&events)[0].html, "<script>let s = `hi`");

        let events = run("```html\n<script>let s = ``", 4);
        assert_eq!(code_events(&events)[0].html, "<script>let s = ``");
    }

    #[test]
    fn lone_backtick_line_is_a_partial_fence() {
        let events = run("```html\n<p>x</p>\n`", 2);
        assert_eq!(code_events(&events)[0].html, "<p>x</p>");

        let events = run("```html\n``", 1);
        assert_eq!(events, vec![GameEvent::Code(CodeArtifact::default())]);
    }

    #[test]
    fn empty_code_block_yields_empty_artifact() {
        let events = run("```html\n", 1);
        assert_eq!(events, vec![GameEvent::Code(CodeArtifact::default())]);

        let closed = run("```html\n```", 1);
        assert_eq!(closed, vec![GameEvent::Code(CodeArtifact::default())]);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut parser = StreamingParser::new();
        feed_chunks(&mut parser, "## Game Features\n- jump", 4);
        assert!(!parser.finalize().is_empty());
        assert!(parser.finalize().is_empty());
        assert!(parser.is_finished());
    }

    #[test]
    fn at_most_one_code_event() {
        let text = "```html\n<a></a>\n```\n```html\n<b></b>\n```\n";
        for size in [1, 5, text.len()] {
            let events = run(text, size);
            let codes = code_events(&events);
            assert_eq!(codes.len(), 1, "chunk size {size}");
            assert_eq!(codes[0].html, "<a></a>");
        }
    }

    #[test]
    fn code_priority_dominates_headings_inside_code() {
        let mut parser = StreamingParser::new();
        feed_chunks(
            &mut parser,
            "```html\n<h2>## Game Features</h2>\n<p>## Suggestions</p>",
            1,
        );
        assert_eq!(parser.state(), ParseState::CodeBlock);

        let events = parser.finalize();
        assert_eq!(code_events(&events).len(), 1);
        assert!(code_events(&events)[0].html.contains("## Game Features"));
    }

    #[test]
    fn headings_after_closed_fence_are_detected() {
        let mut parser = StreamingParser::new();
        feed_chunks(&mut parser, "```html\n<p>## Game Features</p>\n```\n## Suggestions\nAdd sound", 2);
        assert_eq!(parser.state(), ParseState::Suggestions);
        assert_eq!(
            parser.finalize(),
            vec![GameEvent::Suggestions("Add sound".into())]
        );
    }

    #[test]
    fn unchanged_section_text_is_not_reemitted() {
        let mut parser = StreamingParser::with_threshold(5);
        let first = parser.process_token("## Game Features\nDouble jump");
        assert_eq!(first, vec![GameEvent::Features("Double jump".into())]);

        // Whitespace grows the section past the threshold but not its text.
        assert!(parser.process_token("        \n").is_empty());
        assert!(parser.process_token("").is_empty());
        assert!(parser.finalize().is_empty());
    }

    #[test]
    fn explanation_is_not_duplicated_by_finalize() {
        let mut parser = StreamingParser::new();
        let events = parser.process_token("## Building Your Game\nIntro\n```html\n");
        assert_eq!(events, vec![GameEvent::Explanation("Intro".into())]);
        let tail = parser.finalize();
        assert_eq!(tail, vec![GameEvent::Code(CodeArtifact::default())]);
    }

    #[test]
    fn features_batch_after_threshold() {
        let line = "- feature line that is reasonably long\n";
        let mut parser = StreamingParser::new();
        let mut events = parser.process_token("## Game Features\n");
        for _ in 0..10 {
            events.extend(parser.process_token(line));
        }

        let batched: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Features(_)))
            .collect();
        assert!(!batched.is_empty(), "long sections emit before finalize");
        assert!(batched.len() < 10, "output is batched, not per token");

        let tail = parser.finalize();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].text(), Some(line.repeat(10).trim()));
    }

    #[test]
    fn features_flushed_when_suggestions_start() {
        let events = run("## Game Features\n- A\n- B\n## Suggestions\n- C", 1);
        assert_eq!(
            events,
            vec![
                GameEvent::Features("- A\n- B".into()),
                GameEvent::Suggestions("- C".into()),
            ]
        );
    }

    #[test]
    fn no_markers_no_events() {
        assert!(run("Sure! Here is some chatter without any headings.", 3).is_empty());
    }

    #[test]
    fn text_before_first_marker_is_ignored() {
        let events = run("Okay.\n## Building Your Game\nTetris.", 2);
        assert_eq!(events, vec![GameEvent::Explanation("Tetris.".into())]);
    }

    #[test]
    fn chunking_invariance() {
        let mut text = String::from("## Updating Your Game\nNow with lasers and a boss fight.\n\n");
        text.push_str("```html\n<!DOCTYPE html>\n<html><body><script>let s = 0;</script></body></html>\n```\n\n");
        text.push_str("## Updated Features\n");
        for i in 0..12 {
            text.push_str(&format!("- Feature number {i} with some descriptive text\n"));
        }
        text.push_str("\n## Suggested Modifications\n");
        for i in 0..8 {
            text.push_str(&format!("- Try idea {i}, which would make it more fun\n"));
        }

        let fine = run(&text, 1);
        let coarse = run(&text, 50);

        assert_eq!(code_events(&fine), code_events(&coarse));
        assert_eq!(code_events(&fine).len(), 1);
        for kind in [EventType::Explanation, EventType::Features, EventType::Suggestions] {
            let a = last_text(&fine, kind);
            assert!(a.is_some());
            assert_eq!(a, last_text(&coarse, kind));
        }
    }

    #[test]
    fn explanation_and_code_in_same_fragment_keeps_explanation() {
        let mut parser = StreamingParser::new();
        let events = parser.process_token("## Building Your Game\nBreakout.\n```html\n<p>");
        assert_eq!(events, vec![GameEvent::Explanation("Breakout.".into())]);
        assert_eq!(parser.state(), ParseState::CodeBlock);
    }

    #[test]
    fn abort_flushes_text_but_not_code() {
        let mut parser = StreamingParser::new();
        parser.process_token("## Building Your Game\nHalf");
        assert_eq!(parser.abort(), vec![GameEvent::Explanation("Half".into())]);
        assert!(parser.finalize().is_empty());

        let mut parser = StreamingParser::new();
        parser.process_token("```html\n<html>");
        assert!(parser.abort().is_empty());
        assert!(parser.finalize().is_empty());
        assert!(parser.artifact().is_none());
    }

    #[test]
    fn tokens_after_finalize_are_ignored() {
        let mut parser = StreamingParser::new();
        parser.finalize();
        assert!(parser.process_token("## Game Features\nlate").is_empty());
        assert!(parser.buffer().is_empty());
    }

    #[test]
    fn multibyte_text_is_handled() {
        let text = "## Building Your Game\nJeu de serpent 🐍\n```html\n<p>é</p>\n```\n## Game Features\n→ flèches";
        let events = run(text, 1);
        assert_eq!(events[0], GameEvent::Explanation("Jeu de serpent 🐍".into()));
        assert_eq!(code_events(&events)[0].html, "<p>é</p>");
        assert_eq!(events.last().unwrap().text(), Some("→ flèches"));
    }

    #[test]
    fn artifact_accessor_matches_event() {
        let mut parser = StreamingParser::new();
        let events = feed_chunks(&mut parser, SNAKE, 7);
        assert_eq!(parser.artifact(), code_events(&events).first().copied());
    }
}
