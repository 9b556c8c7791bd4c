//! Buffered token rendering for streaming answers.
//!
//! Tokens arrive faster than the transcript is worth re-rendering, so the
//! renderer coalesces repaints to roughly one per 120 ms. The final
//! repaint always happens on `done` or on stream abort, so every token's
//! text is present in the rendered content.

use std::time::{Duration, Instant};

/// Minimum interval between coalesced repaints.
pub const REPAINT_INTERVAL: Duration = Duration::from_millis(120);

/// Accumulates streamed token text and decides when a repaint is due.
#[derive(Debug, Default)]
pub struct TokenStreamRenderer {
    buffer: String,
    dirty: bool,
    last_repaint: Option<Instant>,
}

impl TokenStreamRenderer {
    /// Create an empty renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token's text.
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.dirty = true;
    }

    /// Everything received so far.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// The full content, when a repaint is due now.
    #[must_use]
    pub fn take_if_due(&mut self) -> Option<String> {
        self.take_if_due_at(Instant::now())
    }

    fn take_if_due_at(&mut self, now: Instant) -> Option<String> {
        if !self.dirty {
            return None;
        }
        let due = self
            .last_repaint
            .is_none_or(|last| now.duration_since(last) >= REPAINT_INTERVAL);
        if !due {
            return None;
        }
        self.dirty = false;
        self.last_repaint = Some(now);
        Some(self.buffer.clone())
    }

    /// The final repaint: always returns the full content and clears the
    /// dirty flag. Called on `done` and on stream abort.
    #[must_use]
    pub fn flush(&mut self) -> String {
        self.dirty = false;
        self.last_repaint = Some(Instant::now());
        self.buffer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_push_repaints_immediately() {
        let mut renderer = TokenStreamRenderer::new();
        let t0 = Instant::now();
        renderer.push("hello");
        assert_eq!(renderer.take_if_due_at(t0).as_deref(), Some("hello"));
    }

    #[test]
    fn repaints_are_coalesced_within_the_interval() {
        let mut renderer = TokenStreamRenderer::new();
        let t0 = Instant::now();
        renderer.push("a");
        assert!(renderer.take_if_due_at(t0).is_some());

        renderer.push("b");
        assert!(
            renderer.take_if_due_at(t0 + Duration::from_millis(50)).is_none(),
            "50ms after a repaint nothing is due"
        );
        assert_eq!(
            renderer.take_if_due_at(t0 + Duration::from_millis(130)).as_deref(),
            Some("ab"),
            "the interval elapsing releases the buffered content"
        );
    }

    #[test]
    fn clean_renderer_has_nothing_due() {
        let mut renderer = TokenStreamRenderer::new();
        assert!(renderer.take_if_due_at(Instant::now()).is_none());
        renderer.push("x");
        let _ = renderer.take_if_due_at(Instant::now());
        assert!(
            renderer.take_if_due_at(Instant::now() + REPAINT_INTERVAL).is_none(),
            "no new tokens, no repaint"
        );
    }

    #[test]
    fn flush_always_returns_every_token() {
        let mut renderer = TokenStreamRenderer::new();
        let t0 = Instant::now();
        for (i, token) in ["The ", "quick ", "brown ", "fox"].iter().enumerate() {
            renderer.push(token);
            // Interleave some coalesced repaints
            let _ = renderer.take_if_due_at(t0 + Duration::from_millis(i as u64));
        }
        assert_eq!(renderer.flush(), "The quick brown fox");
    }
}
