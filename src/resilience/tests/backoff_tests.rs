// src/resilience/tests/backoff_tests.rs

use std::time::Duration;
use crate::resilience::LinearBackoff;

#[test]
fn test_backoff_grows_linearly_and_caps_at_three() {
    let mut backoff = LinearBackoff::new(Duration::from_millis(100), 5);

    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));

    // Capped at 3x base
    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));
    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));

    // Sixth retry exceeds max_retries
    assert_eq!(backoff.next_backoff(), None);
}

#[test]
fn test_zero_retries_yields_nothing() {
    let mut backoff = LinearBackoff::new(Duration::from_secs(1), 0);
    assert_eq!(backoff.next_backoff(), None);
}

#[test]
fn test_reset() {
    let mut backoff = LinearBackoff::new(Duration::from_millis(50), 1);
    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(50)));
    assert_eq!(backoff.next_backoff(), None);

    backoff.reset();
    assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(50)));
}
