// src/endpoint/simulated.rs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time;

use crate::endpoint::{ChatCompletion, ChatCompletionRequest, CompletionEndpoint};
use crate::error::{RemoteError, Result};

/// How the simulated endpoint answers completion calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedMode {
    /// Echo the prompt back
    Succeed,
    /// Answer with a 500
    Fail,
    /// Never answer
    Hang,
    /// Answer with a payload that has no choices
    Malformed,
    /// Fail this many calls, then succeed
    FailTimes(usize),
}

/// In-process endpoint with controllable latency and failure modes.
///
/// Counts every completion call and every probe so callers can check how
/// much work actually reached the "remote" side.
#[derive(Debug)]
pub struct SimulatedEndpoint {
    model: String,
    latency_ms: AtomicU64,
    jitter_ms: AtomicU64,
    mode: Mutex<SimulatedMode>,
    probe_healthy: AtomicBool,
    calls: AtomicUsize,
    probes: AtomicUsize,
}

impl Default for SimulatedEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEndpoint {
    pub fn new() -> Self {
        Self {
            model: "simulated-model".to_string(),
            latency_ms: AtomicU64::new(0),
            jitter_ms: AtomicU64::new(0),
            mode: Mutex::new(SimulatedMode::Succeed),
            probe_healthy: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Add up to `jitter` of random extra latency per call
    pub fn with_jitter(self, jitter: Duration) -> Self {
        self.jitter_ms.store(jitter.as_millis() as u64, Ordering::SeqCst);
        self
    }

    pub fn with_mode(self, mode: SimulatedMode) -> Self {
        self.set_mode(mode);
        self
    }

    pub fn set_mode(&self, mode: SimulatedMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
    }

    pub fn set_probe_healthy(&self, healthy: bool) {
        self.probe_healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of completion calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of probes received
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    // Decide the outcome of this call, consuming one FailTimes credit
    fn next_outcome(&self) -> SimulatedMode {
        let mut mode = self.mode.lock().unwrap_or_else(|e| e.into_inner());
        match *mode {
            SimulatedMode::FailTimes(0) => {
                *mode = SimulatedMode::Succeed;
                SimulatedMode::Succeed
            }
            SimulatedMode::FailTimes(n) => {
                *mode = SimulatedMode::FailTimes(n - 1);
                SimulatedMode::Fail
            }
            other => other,
        }
    }

    fn latency(&self) -> Duration {
        let base = self.latency_ms.load(Ordering::SeqCst);
        let jitter = self.jitter_ms.load(Ordering::SeqCst);
        let extra = if jitter > 0 {
            rand::random_range(0..=jitter)
        } else {
            0
        };
        Duration::from_millis(base + extra)
    }
}

#[async_trait]
impl CompletionEndpoint for SimulatedEndpoint {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.next_outcome();

        let latency = self.latency();
        if !latency.is_zero() {
            time::sleep(latency).await;
        }

        let prompt = request
            .messages
            .last()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        let completion = match outcome {
            SimulatedMode::Succeed => {
                ChatCompletion::from_text(self.model.clone(), format!("echo: {}", prompt))
            }
            SimulatedMode::Fail | SimulatedMode::FailTimes(_) => {
                return Err(RemoteError::Status {
                    status: 500,
                    body: "simulated failure".to_string(),
                }
                .into());
            }
            SimulatedMode::Hang => std::future::pending().await,
            SimulatedMode::Malformed => ChatCompletion {
                id: None,
                model: self.model.clone(),
                choices: Vec::new(),
                usage: None,
            },
        };

        completion.validate()?;
        Ok(completion)
    }

    async fn probe(&self) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Http("simulated probe failure".to_string()).into())
        }
    }
}
