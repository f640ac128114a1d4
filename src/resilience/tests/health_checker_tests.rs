// src/resilience/tests/health_checker_tests.rs

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing_test::traced_test;

use crate::config::HealthSettings;
use crate::endpoint::{ChatCompletion, ChatCompletionRequest, CompletionEndpoint, SimulatedEndpoint};
use crate::error::Result;
use crate::resilience::{HealthMonitor, HealthStatus};

fn settings() -> HealthSettings {
    HealthSettings {
        check_interval: Duration::from_secs(30),
        check_timeout: Duration::from_secs(5),
        stale_after: Duration::from_secs(10),
    }
}

fn monitor(endpoint: &Arc<SimulatedEndpoint>) -> HealthMonitor {
    HealthMonitor::new(endpoint.clone(), settings())
}

// Endpoint whose probe never answers
#[derive(Debug)]
struct HangingProbe;

#[async_trait]
impl CompletionEndpoint for HangingProbe {
    async fn complete(&self, _request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        Ok(ChatCompletion::from_text("m", ""))
    }

    async fn probe(&self) -> Result<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_initial_state_is_unknown() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    let monitor = monitor(&endpoint);

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.status, HealthStatus::Unknown);
    assert!(!snapshot.healthy);
    assert!(snapshot.last_checked_at.is_none());
    assert_eq!(endpoint.probes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_first_probe_runs_immediately_on_start() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    let monitor = monitor(&endpoint);

    monitor.start();
    time::sleep(Duration::from_millis(1)).await;

    assert_eq!(endpoint.probes(), 1);
    assert_eq!(monitor.status(), HealthStatus::Healthy);
    assert!(monitor.snapshot().last_checked_at.is_some());
    monitor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_background_probe_follows_interval() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    let monitor = monitor(&endpoint);

    monitor.start();
    time::sleep(Duration::from_secs(61)).await;

    // t = 0, 30, 60
    assert_eq!(endpoint.probes(), 3);

    monitor.stop();
    time::sleep(Duration::from_secs(120)).await;
    assert_eq!(endpoint.probes(), 3);
}

#[tokio::test]
#[traced_test]
async fn test_failure_then_recovery_transitions() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    let monitor = monitor(&endpoint);

    endpoint.set_probe_healthy(false);
    assert!(!monitor.probe_now().await);
    assert_eq!(monitor.status(), HealthStatus::Unhealthy);
    assert!(logs_contain("Endpoint is now unhealthy"));

    endpoint.set_probe_healthy(true);
    assert!(monitor.probe_now().await);
    assert_eq!(monitor.status(), HealthStatus::Healthy);
    assert!(logs_contain("Endpoint is now healthy"));
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_counts_as_unhealthy() {
    let monitor = HealthMonitor::new(Arc::new(HangingProbe), settings());

    assert!(!monitor.probe_now().await);
    assert_eq!(monitor.status(), HealthStatus::Unhealthy);
}

#[tokio::test(start_paused = true)]
async fn test_stale_unhealthy_reading_is_reprobed_once() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    let monitor = monitor(&endpoint);

    endpoint.set_probe_healthy(false);
    monitor.probe_now().await;
    assert_eq!(endpoint.probes(), 1);

    // Fresh unhealthy reading: fail without probing
    time::advance(Duration::from_secs(5)).await;
    assert!(!monitor.ensure_healthy().await);
    assert_eq!(endpoint.probes(), 1);

    // Stale reading: exactly one re-probe, still failing
    time::advance(Duration::from_secs(6)).await;
    assert!(!monitor.ensure_healthy().await);
    assert_eq!(endpoint.probes(), 2);

    // Endpoint recovered and the reading is stale again: self-heal
    endpoint.set_probe_healthy(true);
    time::advance(Duration::from_secs(11)).await;
    assert!(monitor.ensure_healthy().await);
    assert_eq!(endpoint.probes(), 3);
    assert_eq!(monitor.status(), HealthStatus::Healthy);
}

#[tokio::test]
async fn test_unknown_state_probes_before_answering() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    let monitor = monitor(&endpoint);

    assert!(monitor.ensure_healthy().await);
    assert_eq!(endpoint.probes(), 1);

    // Healthy readings are trusted without probing
    assert!(monitor.ensure_healthy().await);
    assert_eq!(endpoint.probes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stale_checks_share_one_probe() {
    let endpoint = Arc::new(SimulatedEndpoint::new());
    endpoint.set_probe_healthy(false);
    let monitor = Arc::new(monitor(&endpoint));

    let checks: Vec<_> = (0..5)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.ensure_healthy().await })
        })
        .collect();

    for check in futures::future::join_all(checks).await {
        assert!(!check.unwrap());
    }
    assert_eq!(endpoint.probes(), 1);
}
