//! Inline think-delimiter tagging.
//!
//! When the configured [`ThinkStyle`] is not `SeparateChannel`, reasoning
//! chunks are re-expressed as answer text wrapped in a marker pair. The
//! tagger guarantees the start marker appears exactly once per response and
//! the end marker exactly once, no matter how many reasoning chunks stream
//! through.

use crate::config::ThinkStyle;

const CODE_SNIPPET_START: &str = "```thinking\n";
const CODE_SNIPPET_END: &str = "\n```\n\n";
const THINK_TAG_START: &str = "<think>\n";
const THINK_TAG_END: &str = "\n</think>\n\n";

/// Visually similar stand-in for a literal triple backtick inside a fenced
/// thinking block (U+02CB modifier letter grave accent).
const NEUTRALIZED_FENCE: &str = "\u{02CB}\u{02CB}\u{02CB}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThinkPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// Per-response state machine for inline reasoning markers.
#[derive(Debug)]
pub struct ThinkTagger {
    style: ThinkStyle,
    phase: ThinkPhase,
}

impl ThinkTagger {
    pub fn new(style: ThinkStyle) -> Self {
        Self {
            style,
            phase: ThinkPhase::NotStarted,
        }
    }

    /// True when this style folds reasoning into the text channel.
    pub fn is_inline(&self) -> bool {
        self.style.is_inline()
    }

    /// True while a think span is open and the end marker is still owed.
    pub fn in_progress(&self) -> bool {
        self.phase == ThinkPhase::InProgress
    }

    /// Wrap one reasoning chunk for the text channel.
    ///
    /// The first chunk is prefixed with the style's start marker; literal
    /// triple backticks are neutralized so they cannot terminate the
    /// surrounding markdown fence.
    pub fn wrap_chunk(&mut self, chunk: &str) -> String {
        debug_assert!(self.is_inline());
        let body = if chunk.contains("```") {
            chunk.replace("```", NEUTRALIZED_FENCE)
        } else {
            chunk.to_string()
        };

        if self.phase == ThinkPhase::NotStarted {
            self.phase = ThinkPhase::InProgress;
            let start = match self.style {
                ThinkStyle::CodeSnippet => CODE_SNIPPET_START,
                ThinkStyle::EotDelimited => THINK_TAG_START,
                ThinkStyle::SeparateChannel => "",
            };
            format!("{start}{body}")
        } else {
            body
        }
    }

    /// The end marker owed for the open think span, emitted at most once.
    pub fn end_marker(&mut self) -> Option<&'static str> {
        if self.phase != ThinkPhase::InProgress {
            return None;
        }
        self.phase = ThinkPhase::Completed;
        match self.style {
            ThinkStyle::CodeSnippet => Some(CODE_SNIPPET_END),
            ThinkStyle::EotDelimited => Some(THINK_TAG_END),
            ThinkStyle::SeparateChannel => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_marker_appears_exactly_once() {
        let mut tagger = ThinkTagger::new(ThinkStyle::CodeSnippet);
        let first = tagger.wrap_chunk("let me");
        let second = tagger.wrap_chunk(" think");
        assert!(first.starts_with(CODE_SNIPPET_START));
        assert!(!second.contains(CODE_SNIPPET_START));
    }

    #[test]
    fn end_marker_is_emitted_at_most_once() {
        let mut tagger = ThinkTagger::new(ThinkStyle::CodeSnippet);
        let _ = tagger.wrap_chunk("hmm");
        assert_eq!(tagger.end_marker(), Some(CODE_SNIPPET_END));
        assert_eq!(tagger.end_marker(), None);
    }

    #[test]
    fn no_end_marker_before_any_reasoning() {
        let mut tagger = ThinkTagger::new(ThinkStyle::EotDelimited);
        assert_eq!(tagger.end_marker(), None);
    }

    #[test]
    fn interior_fences_are_neutralized() {
        let mut tagger = ThinkTagger::new(ThinkStyle::CodeSnippet);
        let out = tagger.wrap_chunk("code: ```rust\nfn f() {}\n```");
        assert!(!out[CODE_SNIPPET_START.len()..].contains("```"));
        assert!(out.contains(NEUTRALIZED_FENCE));
    }

    #[test]
    fn eot_style_uses_think_tags() {
        let mut tagger = ThinkTagger::new(ThinkStyle::EotDelimited);
        let first = tagger.wrap_chunk("why");
        assert!(first.starts_with(THINK_TAG_START));
        assert_eq!(tagger.end_marker(), Some(THINK_TAG_END));
    }

    #[test]
    fn later_reasoning_runs_do_not_restart_the_marker() {
        let mut tagger = ThinkTagger::new(ThinkStyle::CodeSnippet);
        let _ = tagger.wrap_chunk("first");
        let _ = tagger.end_marker();
        let again = tagger.wrap_chunk("more");
        assert!(!again.contains(CODE_SNIPPET_START));
    }
}
