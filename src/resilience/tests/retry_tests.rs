// src/resilience/tests/retry_tests.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

use super::utils::FlakyOperation;
use crate::error::{ClientError, RemoteError};
use crate::resilience::{RetryPolicy, RetryingExecutor};

fn executor(max_retries: u32) -> RetryingExecutor {
    RetryingExecutor::new(RetryPolicy {
        attempt_timeout: Duration::from_secs(2),
        max_retries,
        base_delay: Duration::from_millis(100),
    })
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success_has_no_delay() {
    let op = FlakyOperation::new(0);
    let start = Instant::now();

    let result = executor(3).run(|| op.call()).await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(op.attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failures() {
    let op = FlakyOperation::new(2);
    let start = Instant::now();

    let result = executor(3).run(|| op.call()).await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(op.attempts(), 3);
    // 100ms + 200ms of backoff
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_always_timing_out_makes_max_retries_plus_one_attempts() {
    for max_retries in 0..4u32 {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let result: crate::error::Result<()> = executor(max_retries)
            .run(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::pending()
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), max_retries as usize + 1);
        match result {
            Err(ClientError::Timeout(d)) => assert_eq!(d, Duration::from_secs(2)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_final_error_is_surfaced_unchanged() {
    let op = FlakyOperation::new(10);

    let result = executor(2).run(|| op.call()).await;

    assert_eq!(op.attempts(), 3);
    match result {
        Err(ClientError::Remote(RemoteError::Http(msg))) => {
            assert_eq!(msg, "simulated failure 3")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_attempt_then_fast_attempt() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let result = executor(1)
        .run(|| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    time::sleep(Duration::from_secs(10)).await;
                }
                Ok::<_, ClientError>(n)
            }
        })
        .await;

    assert_eq!(result.unwrap(), 1);
}
