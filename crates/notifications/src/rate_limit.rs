//! Sliding-window admission for generic notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Admits at most `max` events within any trailing `window`.
///
/// Rejected events are dropped, not queued.
#[derive(Debug, Clone)]
pub struct RateWindow {
    max: usize,
    window: Duration,
    admitted: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            admitted: VecDeque::with_capacity(max.min(64)),
        }
    }

    /// Record `now` and return `true` if the event fits in the window.
    pub fn try_admit(&mut self, now: Instant) -> bool {
        self.prune(now);
        if self.admitted.len() >= self.max {
            return false;
        }
        self.admitted.push_back(now);
        true
    }

    /// Events currently counted against the window.
    pub fn in_window(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.admitted.len()
    }

    // An entry exactly `window` old still counts.
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) > self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }
}
