//! Debounce for search text input.
//!
//! Last input wins: each keystroke pushes the deadline back, and the text is
//! released once the input has been quiet for the configured delay.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiet period before a query is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct QueryDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record new input at `at` and return the instant it becomes due.
    pub fn input(&mut self, text: impl Into<String>, at: Instant) -> Instant {
        let deadline = at + self.delay;
        self.pending = Some((text.into(), deadline));
        deadline
    }

    /// Deadline of the pending input, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Release the pending text if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let due = self.pending.as_ref().is_some_and(|(_, deadline)| *deadline <= now);
        if due { self.pending.take().map(|(text, _)| text) } else { None }
    }

    /// Drop pending input without releasing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
