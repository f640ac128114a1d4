// src/admission/mod.rs
//! Admission control for calls to the inference endpoint.
//!
//! Two limits are checked together under one lock:
//!
//! 1. **Concurrency** - at most `max_concurrent` calls in flight
//! 2. **Rate** - at most `max_per_window` admissions in the trailing window
//!
//! Excess calls are rejected immediately with `ClientError::Overloaded`;
//! nothing is queued.

mod window;

#[cfg(test)]
mod tests;

pub use window::RequestWindow;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RateLimitSettings;
use crate::error::{ClientError, Result};

/// Limits enforced by the gate
#[derive(Debug, Clone)]
pub struct AdmissionLimits {
    /// When false, both limits are bypassed but active calls are still tracked
    pub enabled: bool,
    pub max_concurrent: usize,
    pub max_per_window: usize,
    pub window: Duration,
}

impl From<&RateLimitSettings> for AdmissionLimits {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_concurrent: settings.max_concurrent_requests,
            max_per_window: settings.max_requests_per_minute,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct GateState {
    active: HashSet<Uuid>,
    window: RequestWindow,
}

#[derive(Debug)]
struct GateShared {
    state: Mutex<GateState>,
    limits: AdmissionLimits,
    closed: AtomicBool,
    active_tx: watch::Sender<usize>,
}

impl GateShared {
    fn release(&self, id: Uuid) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let removed = state.active.remove(&id);
        if removed {
            self.active_tx.send_replace(state.active.len());
        }
        removed
    }
}

/// Bounds in-flight calls and admissions per window
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    shared: Arc<GateShared>,
}

impl AdmissionGate {
    pub fn new(limits: AdmissionLimits) -> Self {
        let window = RequestWindow::new(limits.window);
        let (active_tx, _) = watch::channel(0);

        Self {
            shared: Arc::new(GateShared {
                state: Mutex::new(GateState {
                    active: HashSet::new(),
                    window,
                }),
                limits,
                closed: AtomicBool::new(false),
                active_tx,
            }),
        }
    }

    /// Admit one call or reject it immediately.
    ///
    /// The returned permit releases its slot when dropped.
    pub fn try_admit(&self) -> Result<AdmissionPermit> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ShuttingDown);
        }

        let now = Instant::now();
        let limits = &self.shared.limits;
        let mut state = self
            .shared
            .state
            .lock()
            .map_err(|_| ClientError::Internal("admission state poisoned".to_string()))?;

        state.window.prune(now);

        if limits.enabled {
            if state.active.len() >= limits.max_concurrent {
                warn!(
                    active = state.active.len(),
                    limit = limits.max_concurrent,
                    "Admission rejected: concurrency limit"
                );
                return Err(ClientError::Overloaded(format!(
                    "{} of {} concurrent requests in flight",
                    state.active.len(),
                    limits.max_concurrent
                )));
            }

            if state.window.len() >= limits.max_per_window {
                let retry_after = state.window.retry_after(now);
                warn!(
                    in_window = state.window.len(),
                    limit = limits.max_per_window,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Admission rejected: rate limit"
                );
                return Err(ClientError::Overloaded(format!(
                    "{} requests in the last {}s (limit {}), retry after {:?}",
                    state.window.len(),
                    limits.window.as_secs(),
                    limits.max_per_window,
                    retry_after
                )));
            }
        }

        let id = Uuid::new_v4();
        state.active.insert(id);
        state.window.record(now);
        self.shared.active_tx.send_replace(state.active.len());
        debug!(request_id = %id, active = state.active.len(), "Admitted");

        Ok(AdmissionPermit {
            id,
            shared: Arc::clone(&self.shared),
            released: false,
        })
    }

    /// Release an admitted call. Returns false if `id` was not active.
    pub fn release(&self, id: Uuid) -> bool {
        self.shared.release(id)
    }

    /// Reject every future admission with `ShuttingDown`. In-flight permits
    /// keep working.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Calls currently in flight
    pub fn active(&self) -> usize {
        self.shared
            .state
            .lock()
            .map(|state| state.active.len())
            .unwrap_or_else(|e| e.into_inner().active.len())
    }

    /// Admissions within the trailing window
    pub fn requests_in_window(&self) -> usize {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        state.window.prune(Instant::now());
        state.window.len()
    }

    /// Receiver that observes the active count every time it changes
    pub fn subscribe_active(&self) -> watch::Receiver<usize> {
        self.shared.active_tx.subscribe()
    }
}

/// Proof of admission. Dropping it releases the slot exactly once.
#[derive(Debug)]
pub struct AdmissionPermit {
    id: Uuid,
    shared: Arc<GateShared>,
    released: bool,
}

impl AdmissionPermit {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Release now instead of at drop
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.release(self.id);
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.release_inner();
    }
}
