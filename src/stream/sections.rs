//! Section boundary detection over accumulated model output.
//!
//! The model answers in markdown with a fixed set of headings and one
//! fenced HTML block. [`SectionMatcher`] finds those markers in a region of
//! the buffer and ranks them by transition priority:
//!
//! ```text
//! CodeBlock > Suggestions > Features > Explanation > Waiting
//! ```
//!
//! Code dominates because a generated game routinely contains text such as
//! "Game Features" inside its own HTML.

use once_cell::sync::Lazy;
use regex::Regex;

/// Opening and closing fence of a code block.
pub const CODE_FENCE: &str = "```";

static EXPLANATION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#{2,}[ \t]*(?:building|updating) your game").expect("valid explanation regex")
});

static CODE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```html").expect("valid code fence regex"));

static FEATURES_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#{2,}[ \t]*(?:game|updated|added) features").expect("valid features regex")
});

static SUGGESTIONS_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#{2,}[ \t]*(?:suggested modifications|suggestions)")
        .expect("valid suggestions regex")
});

/// The section the parser is currently attributing text to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseState {
    /// No marker seen yet.
    #[default]
    Waiting,
    /// Prose describing the game.
    Explanation,
    /// Inside the fenced HTML block.
    CodeBlock,
    /// Feature list.
    Features,
    /// Suggested follow-up modifications.
    Suggestions,
}

impl ParseState {
    /// Transition priority. A marker only causes a transition when its
    /// priority is above the current state's.
    pub fn priority(self) -> u8 {
        match self {
            ParseState::Waiting => 0,
            ParseState::Explanation => 1,
            ParseState::Features => 2,
            ParseState::Suggestions => 3,
            ParseState::CodeBlock => 4,
        }
    }
}

/// A section marker located in the buffer.
///
/// Offsets are byte offsets into the full buffer, always on char
/// boundaries. Section content begins at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub state: ParseState,
    pub start: usize,
    pub end: usize,
}

/// Stateless marker detector.
///
/// Only the first occurrence of each marker kind in the scanned region is
/// reported. Nothing here mutates the buffer.
#[derive(Debug, Clone, Copy)]
pub struct SectionMatcher {
    code_fence: bool,
}

impl Default for SectionMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionMatcher {
    /// Matcher that recognizes every marker kind.
    pub fn new() -> Self {
        Self { code_fence: true }
    }

    /// Matcher that ignores opening code fences, used once the turn's code
    /// block has already closed.
    pub fn without_code_fence() -> Self {
        Self { code_fence: false }
    }

    /// All markers found in `buffer[from..]`, highest priority first.
    pub fn scan(&self, buffer: &str, from: usize) -> Vec<Marker> {
        if from > buffer.len() || !buffer.is_char_boundary(from) {
            return Vec::new();
        }

        let mut patterns: Vec<(ParseState, &Regex)> = Vec::with_capacity(4);
        if self.code_fence {
            patterns.push((ParseState::CodeBlock, &*CODE_START));
        }
        patterns.push((ParseState::Suggestions, &*SUGGESTIONS_START));
        patterns.push((ParseState::Features, &*FEATURES_START));
        patterns.push((ParseState::Explanation, &*EXPLANATION_START));

        patterns
            .into_iter()
            .filter_map(|(state, regex)| {
                regex.find_at(buffer, from).map(|m| Marker {
                    state,
                    start: m.start(),
                    end: m.end(),
                })
            })
            .collect()
    }

    /// The highest-priority marker in `buffer[from..]`, if any.
    pub fn detect(&self, buffer: &str, from: usize) -> Option<Marker> {
        self.scan(buffer, from).into_iter().next()
    }
}

/// Byte offset of the closing fence in `buffer[from..]`, if present.
///
/// Only meaningful while a code block is open; `from` is where the search
/// for a fence should begin.
pub fn find_code_close(buffer: &str, from: usize) -> Option<usize> {
    buffer
        .get(from..)
        .and_then(|rest| rest.find(CODE_FENCE))
        .map(|idx| from + idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        assert!(ParseState::CodeBlock.priority() > ParseState::Suggestions.priority());
        assert!(ParseState::Suggestions.priority() > ParseState::Features.priority());
        assert!(ParseState::Features.priority() > ParseState::Explanation.priority());
        assert!(ParseState::Explanation.priority() > ParseState::Waiting.priority());
    }

    #[test]
    fn detects_explanation_synonyms() {
        let matcher = SectionMatcher::new();
        for text in ["## Building Your Game\n", "## updating your game", "### BUILDING YOUR GAME"] {
            let marker = matcher.detect(text, 0).unwrap();
            assert_eq!(marker.state, ParseState::Explanation, "{text}");
        }
    }

    #[test]
    fn detects_features_and_suggestions_synonyms() {
        let matcher = SectionMatcher::new();
        assert_eq!(
            matcher.detect("## Game Features", 0).unwrap().state,
            ParseState::Features
        );
        assert_eq!(
            matcher.detect("## Updated Features", 0).unwrap().state,
            ParseState::Features
        );
        assert_eq!(
            matcher.detect("## Suggested Modifications", 0).unwrap().state,
            ParseState::Suggestions
        );
        assert_eq!(
            matcher.detect("##Suggestions", 0).unwrap().state,
            ParseState::Suggestions
        );
    }

    #[test]
    fn single_hash_is_not_a_section() {
        assert!(SectionMatcher::new().detect("# Game Features", 0).is_none());
    }

    #[test]
    fn marker_offsets_bound_the_heading() {
        let text = "intro\n## Game Features\n- jump";
        let marker = SectionMatcher::new().detect(text, 0).unwrap();
        assert_eq!(&text[marker.start..marker.end], "## Game Features");
        assert_eq!(&text[marker.end..], "\n- jump");
    }

    #[test]
    fn code_fence_dominates_later_headings() {
        let text = "## Building Your Game\nhi\n```html\n<h1>## Game Features</h1>";
        let marker = SectionMatcher::new().detect(text, 0).unwrap();
        assert_eq!(marker.state, ParseState::CodeBlock);
        assert_eq!(&text[marker.start..marker.end], "```html");
    }

    #[test]
    fn code_fence_is_case_insensitive() {
        let marker = SectionMatcher::new().detect("```HTML\n", 0).unwrap();
        assert_eq!(marker.state, ParseState::CodeBlock);
    }

    #[test]
    fn other_fence_languages_are_not_code_markers() {
        assert!(SectionMatcher::new().detect("```js\nlet x;", 0).is_none());
    }

    #[test]
    fn scan_reports_every_kind_by_priority() {
        let text = "## Building Your Game\n```html\n```\n## Game Features\n## Suggestions\n";
        let states: Vec<_> = SectionMatcher::new()
            .scan(text, 0)
            .into_iter()
            .map(|m| m.state)
            .collect();
        assert_eq!(
            states,
            vec![
                ParseState::CodeBlock,
                ParseState::Suggestions,
                ParseState::Features,
                ParseState::Explanation,
            ]
        );
    }

    #[test]
    fn scan_respects_region_start() {
        let text = "## Game Features\nfoo\n```\n## Suggestions";
        let from = text.find("```").unwrap() + 3;
        let markers = SectionMatcher::new().scan(text, from);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].state, ParseState::Suggestions);
        assert!(markers[0].start >= from);
    }

    #[test]
    fn first_occurrence_wins() {
        let text = "## Game Features\na\n## Game Features\nb";
        let marker = SectionMatcher::new().detect(text, 0).unwrap();
        assert_eq!(marker.start, 0);
    }

    #[test]
    fn without_code_fence_skips_code_markers() {
        let text = "```html\n## Game Features";
        let marker = SectionMatcher::without_code_fence().detect(text, 0).unwrap();
        assert_eq!(marker.state, ParseState::Features);
    }

    #[test]
    fn invalid_region_start_yields_nothing() {
        let text = "é## Game Features";
        assert!(SectionMatcher::new().scan(text, 1).is_empty());
        assert!(SectionMatcher::new().scan(text, 100).is_empty());
    }

    #[test]
    fn find_code_close_from_offset() {
        let text = "```html\n<p></p>\n```\n";
        let body_start = 7;
        assert_eq!(find_code_close(text, body_start), Some(16));
        assert_eq!(find_code_close(text, 17), None);
        assert_eq!(find_code_close(text, 500), None);
    }
}
