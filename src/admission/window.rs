// src/admission/window.rs

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Admission timestamps within a trailing window.
///
/// Unlike a bucketed window this keeps one timestamp per admission, so the
/// count is exact: an admission stops counting the moment it is older than
/// the window.
#[derive(Debug)]
pub struct RequestWindow {
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl RequestWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timestamps: VecDeque::new(),
        }
    }

    /// Discard timestamps older than the window. Timestamps are appended in
    /// order, so only the front ever needs inspecting.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.timestamps.push_back(now);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Time until the oldest admission leaves the window
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.timestamps
            .front()
            .map(|&oldest| self.window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }
}
