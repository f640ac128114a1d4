// src/resilience/mod.rs
//! Resilience features for calls to the inference endpoint.
//!
//! 1. **Health Checks** - Probe the endpoint in the background and on demand
//! 2. **Retry with Linear Backoff** - Per-attempt deadline, bounded retries

mod backoff;
mod health_checker;
mod retry;

#[cfg(test)]
mod tests;

// Re-export key components
pub use backoff::LinearBackoff;
pub use health_checker::{HealthMonitor, HealthSnapshot, HealthStatus};
pub use retry::{RetryPolicy, RetryingExecutor};
