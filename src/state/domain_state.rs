use std::time::{Duration, Instant};

/// Tracks request pacing for one domain
///
/// The gap owed is drawn when a request is dispatched and counted from the
/// moment that request finishes, so a slow response never eats into it.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests dispatched to this domain in the current run
    pub request_count: u32,

    /// When the last request to this domain finished
    pub last_finished: Option<Instant>,

    /// Idle gap owed after the last request finished
    pub pending_delay: Duration,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be dispatched now
    pub fn can_request(&self, now: Instant) -> bool {
        self.time_until_next_request(now).is_none()
    }

    /// Records that a request was dispatched
    ///
    /// `delay` is the gap (base + jitter) to leave once it finishes.
    pub fn record_dispatch(&mut self, delay: Duration) {
        self.request_count += 1;
        self.pending_delay = delay;
    }

    /// Records that the in-flight request finished at `now`
    pub fn record_finish(&mut self, now: Instant) {
        self.last_finished = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_finished?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.pending_delay {
            Some(self.pending_delay - elapsed)
        } else {
            None
        }
    }
}
