use std::future::Future;
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::error::{ClientError, Result};
use crate::resilience::backoff::LinearBackoff;

/// Deadline and retry budget for one call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Deadline applied to each attempt separately
    pub attempt_timeout: Duration,
    /// Attempts allowed after the first
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            attempt_timeout: settings.timeout,
            max_retries: settings.max_retries,
            base_delay: settings.base_delay,
        }
    }
}

/// Runs an operation with a per-attempt deadline and bounded retries.
///
/// Every failure is retried the same way; there is no distinction between
/// transient and permanent errors.
#[derive(Debug, Clone)]
pub struct RetryingExecutor {
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds or retries are exhausted. The last
    /// failure is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.policy.attempt_timeout;
        let mut backoff = LinearBackoff::new(self.policy.base_delay, self.policy.max_retries);
        let mut attempt: u32 = 1;

        loop {
            let result = match time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(timeout)),
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying: {}",
                        err
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(attempt, "Giving up: {}", err);
                    return Err(err);
                }
            }
        }
    }
}
