use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::config::HealthSettings;
use crate::endpoint::CompletionEndpoint;

/// Health of the inference endpoint as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No probe has completed yet
    Unknown,
    Healthy,
    Unhealthy,
}

/// Read-only view handed to collaborators
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub healthy: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct HealthState {
    status: HealthStatus,
    checked_at: Option<Instant>,
    checked_at_wall: Option<DateTime<Utc>>,
}

type SharedState = Arc<RwLock<HealthState>>;

/// Periodic and on-demand probing of the inference endpoint
#[derive(Debug)]
pub struct HealthMonitor {
    endpoint: Arc<dyn CompletionEndpoint>,
    config: HealthSettings,
    state: SharedState,
    /// Serialises out-of-band probes so concurrent callers share one result
    probe_lock: tokio::sync::Mutex<()>,
    cancel_flag: Arc<AtomicBool>,
    task: Mutex<Option<task::JoinHandle<()>>>,
}

impl HealthMonitor {
    pub fn new(endpoint: Arc<dyn CompletionEndpoint>, config: HealthSettings) -> Self {
        Self {
            endpoint,
            config,
            state: Arc::new(RwLock::new(HealthState {
                status: HealthStatus::Unknown,
                checked_at: None,
                checked_at_wall: None,
            })),
            probe_lock: tokio::sync::Mutex::new(()),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Start the background probe. The first probe runs immediately, later
    /// ones every `check_interval`.
    pub fn start(&self) {
        let endpoint = Arc::clone(&self.endpoint);
        let state = Arc::clone(&self.state);
        let interval = self.config.check_interval;
        let timeout = self.config.check_timeout;
        let cancel_flag = Arc::clone(&self.cancel_flag);
        cancel_flag.store(false, Ordering::SeqCst);

        let handle = task::spawn(async move {
            let mut interval_timer = time::interval(interval);

            loop {
                interval_timer.tick().await;

                // Check if we should stop
                if cancel_flag.load(Ordering::SeqCst) {
                    break;
                }

                let healthy = run_probe(endpoint.as_ref(), timeout).await;
                record(&state, healthy);
            }

            debug!("Health monitor task stopped");
        });

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the background probe
    pub fn stop(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }

    /// Probe right now and record the result
    pub async fn probe_now(&self) -> bool {
        let healthy = run_probe(self.endpoint.as_ref(), self.config.check_timeout).await;
        record(&self.state, healthy);
        healthy
    }

    /// Whether a call may be dispatched.
    ///
    /// Unknown counts as unhealthy. A non-healthy reading older than
    /// `stale_after` (or no reading at all) is re-probed once before the
    /// answer is given.
    pub async fn ensure_healthy(&self) -> bool {
        if self.status() == HealthStatus::Healthy {
            return true;
        }
        if !self.is_stale() {
            return false;
        }

        let _guard = self.probe_lock.lock().await;
        // Another caller may have re-probed while we waited
        if !self.is_stale() {
            return self.status() == HealthStatus::Healthy;
        }

        info!("Health reading is stale, re-probing endpoint");
        self.probe_now().await
    }

    pub fn status(&self) -> HealthStatus {
        self.read_state(|state| state.status)
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == HealthStatus::Healthy
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.read_state(|state| HealthSnapshot {
            status: state.status,
            healthy: state.status == HealthStatus::Healthy,
            last_checked_at: state.checked_at_wall,
        })
    }

    fn is_stale(&self) -> bool {
        let stale_after = self.config.stale_after;
        self.read_state(|state| match state.checked_at {
            Some(at) => at.elapsed() > stale_after,
            None => true,
        })
    }

    fn read_state<T>(&self, f: impl FnOnce(&HealthState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_probe(endpoint: &dyn CompletionEndpoint, timeout: std::time::Duration) -> bool {
    match time::timeout(timeout, endpoint.probe()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Endpoint health check failed: {}", e);
            false
        }
        Err(_) => {
            error!("Endpoint health check timed out after {:?}", timeout);
            false
        }
    }
}

fn record(state: &SharedState, healthy: bool) {
    let mut state = state.write().unwrap_or_else(|e| e.into_inner());
    let next = if healthy {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let previous = std::mem::replace(&mut state.status, next);
    state.checked_at = Some(Instant::now());
    state.checked_at_wall = Some(Utc::now());

    if previous != next {
        match next {
            HealthStatus::Healthy => info!(?previous, "Endpoint is now healthy"),
            _ => warn!(?previous, "Endpoint is now unhealthy"),
        }
    }
}
