use std::time::Duration;

/// Number of base delays the backoff is capped at
const MAX_MULTIPLIER: u32 = 3;

/// Linear backoff capped at three times the base delay.
///
/// The n-th retry (1-based) waits `min(base * n, base * 3)`. No delay is
/// produced before the first attempt.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    /// Retries handed out so far
    current_attempt: u32,
    max_retries: u32,
    base_delay: Duration,
}

impl LinearBackoff {
    pub fn new(base_delay: Duration, max_retries: u32) -> Self {
        Self {
            current_attempt: 0,
            max_retries,
            base_delay,
        }
    }

    /// Delay before the next retry, or None once retries are exhausted
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_retries {
            return None;
        }
        self.current_attempt += 1;
        Some(Self::delay_for(self.base_delay, self.current_attempt))
    }

    pub fn delay_for(base_delay: Duration, attempt: u32) -> Duration {
        base_delay * attempt.min(MAX_MULTIPLIER)
    }

    /// Reset the backoff to start from the beginning
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}
