// src/resilience/tests/mod.rs
//! Tests for resilience features

mod backoff_tests;
mod health_checker_tests;
mod retry_tests;

// Common test utilities for resilience testing
pub(crate) mod utils {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::{ClientError, RemoteError, Result};

    /// Operation that fails a fixed number of times before succeeding
    #[derive(Debug, Clone)]
    pub struct FlakyOperation {
        attempts: Arc<AtomicUsize>,
        failures: usize,
    }

    impl FlakyOperation {
        pub fn new(failures: usize) -> Self {
            Self {
                attempts: Arc::new(AtomicUsize::new(0)),
                failures,
            }
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub async fn call(&self) -> Result<&'static str> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(ClientError::Remote(RemoteError::Http(format!(
                    "simulated failure {}",
                    n
                ))))
            } else {
                Ok("done")
            }
        }
    }
}
