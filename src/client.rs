// src/client.rs

use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::admission::{AdmissionGate, AdmissionLimits};
use crate::cache::{cache_key, ResponseCache};
use crate::config::ClientConfig;
use crate::endpoint::{ChatCompletionRequest, CompletionEndpoint, HttpEndpoint};
use crate::error::{ClientError, Result};
use crate::resilience::{HealthMonitor, HealthSnapshot, RetryPolicy, RetryingExecutor};
use crate::{cache_op, request_event};

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Identifies logically identical requests for deduplication
    pub cache_key: Option<String>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

/// Aggregate counters, read-only for collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total_requests: u64,
    pub total_errors: u64,
    pub active_requests: usize,
    /// Live entries only; expired ones awaiting the sweep are not counted
    pub cache_size: usize,
    pub requests_in_window: usize,
}

/// Resilient client for a single inference endpoint
///
/// Owns the response cache, the admission gate, the health monitor and the
/// retrying executor, and composes them into [`ResilientClient::execute`]:
///
/// ```plaintext
/// execute ──► cache lookup ──hit──────────────────────────────► result
///                  │ miss
///                  ▼
///            admission gate ──rejected──► Overloaded
///                  │
///                  ▼
///            health monitor ──not healthy──► Unavailable
///                  │
///                  ▼
///          retrying executor ──► endpoint ──► cache store ──► result
/// ```
///
/// Construct it once and share it behind an `Arc`.
#[derive(Debug)]
pub struct ResilientClient {
    config: ClientConfig,
    endpoint: Arc<dyn CompletionEndpoint>,
    cache: ResponseCache,
    gate: AdmissionGate,
    monitor: HealthMonitor,
    executor: RetryingExecutor,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    shutting_down: AtomicBool,
}

impl ResilientClient {
    pub fn new(config: ClientConfig, endpoint: Arc<dyn CompletionEndpoint>) -> Result<Self> {
        config.validate()?;

        let gate = AdmissionGate::new(AdmissionLimits::from(&config.rate_limit));
        let monitor = HealthMonitor::new(Arc::clone(&endpoint), config.health.clone());
        let executor = RetryingExecutor::new(RetryPolicy::from(&config.retry));

        Ok(Self {
            config,
            endpoint,
            cache: ResponseCache::new(),
            gate,
            monitor,
            executor,
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Client talking HTTP to the configured endpoint
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let endpoint = Arc::new(HttpEndpoint::new(&config.endpoint));
        Self::new(config, endpoint)
    }

    /// Start background work: health probing (first probe immediately) and
    /// the cache sweep.
    pub fn start(&self) {
        self.monitor.start();
        if self.config.cache.enabled {
            self.cache.start_sweeper(self.config.cache.cleanup_interval);
        }
        info!(
            base_url = %self.config.endpoint.base_url,
            model = %self.config.endpoint.model,
            max_concurrent = self.config.rate_limit.max_concurrent_requests,
            max_per_minute = self.config.rate_limit.max_requests_per_minute,
            "Resilient client started"
        );
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one prompt against the endpoint and return the first choice's text
    pub async fn execute(&self, prompt: &str, options: ExecuteOptions) -> Result<String> {
        let started = Instant::now();

        if self.is_shutting_down() {
            return Err(ClientError::ShuttingDown);
        }

        let cache_key = options
            .cache_key
            .as_deref()
            .filter(|_| self.config.cache.enabled);

        if let Some(key) = cache_key {
            match self.cache.lookup(key) {
                Ok(Some(value)) => {
                    cache_op!("lookup", key, true);
                    self.total_requests.fetch_add(1, Ordering::SeqCst);
                    request_event!("-", true, "ok", started.elapsed().as_millis() as u64);
                    return Ok(value);
                }
                Ok(None) => cache_op!("lookup", key, false),
                Err(e) => warn!("Cache lookup failed, recomputing: {}", e),
            }
        }

        let permit = match self.gate.try_admit() {
            Ok(permit) => permit,
            Err(e) => {
                if matches!(e, ClientError::Overloaded(_)) {
                    self.total_requests.fetch_add(1, Ordering::SeqCst);
                }
                return Err(e);
            }
        };

        if !self.monitor.ensure_healthy().await {
            drop(permit);
            return Err(ClientError::Unavailable(format!(
                "endpoint {} failed its health check",
                self.config.endpoint.base_url
            )));
        }

        self.total_requests.fetch_add(1, Ordering::SeqCst);

        let request = ChatCompletionRequest::single_prompt(
            self.config.endpoint.model.clone(),
            prompt,
            options.temperature,
            options.max_output_tokens,
        );
        let endpoint = self.endpoint.as_ref();
        let request = &request;
        // Schema checks run here too, whatever the endpoint already checked
        let result = self
            .executor
            .run(move || async move {
                let completion = endpoint.complete(request).await?;
                completion.validate()?;
                Ok::<_, ClientError>(completion)
            })
            .await;

        let outcome = match result {
            Ok(completion) => {
                let text = completion.first_text();
                if let Some(key) = cache_key {
                    self.store_result(key, &text);
                }
                Ok(text)
            }
            Err(e) => {
                self.total_errors.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        };

        request_event!(
            permit.id(),
            false,
            match &outcome {
                Ok(_) => "ok",
                Err(_) => "error",
            },
            started.elapsed().as_millis() as u64
        );
        permit.release();

        outcome
    }

    /// Like [`execute`](Self::execute), deriving the cache key from the
    /// operation name and its arguments when none is given.
    pub async fn execute_operation(
        &self,
        operation: &str,
        args: &Value,
        prompt: &str,
        mut options: ExecuteOptions,
    ) -> Result<String> {
        if options.cache_key.is_none() {
            options.cache_key = Some(cache_key(operation, args));
        }
        self.execute(prompt, options).await
    }

    fn store_result(&self, key: &str, text: &str) {
        // The cache was flushed at shutdown; keep it empty
        if self.is_shutting_down() {
            return;
        }
        match self.cache.store(key, text, self.config.cache.ttl) {
            Ok(()) => cache_op!("store", key, false),
            Err(e) => warn!("Cache store failed: {}", e),
        }
    }

    /// Stop accepting calls, clear the cache and stop background work.
    ///
    /// Idempotent. Does not wait for in-flight calls; see
    /// [`crate::shutdown::drain`].
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.gate.close();
        self.cache.stop_sweeper();
        if let Err(e) = self.cache.flush() {
            warn!("Cache flush at shutdown failed: {}", e);
        }
        self.monitor.stop();

        info!(
            active_requests = self.gate.active(),
            "Resilient client shutting down"
        );
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn health(&self) -> HealthSnapshot {
        self.monitor.snapshot()
    }

    /// Probe the endpoint now, outside the regular schedule
    pub async fn check_health(&self) -> HealthSnapshot {
        self.monitor.probe_now().await;
        self.monitor.snapshot()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            total_requests: self.total_requests.load(Ordering::SeqCst),
            total_errors: self.total_errors.load(Ordering::SeqCst),
            active_requests: self.gate.active(),
            cache_size: self.cache.live_len(),
            requests_in_window: self.gate.requests_in_window(),
        }
    }

    pub fn active_requests(&self) -> usize {
        self.gate.active()
    }

    /// Observe the in-flight count as it changes
    pub fn subscribe_active(&self) -> watch::Receiver<usize> {
        self.gate.subscribe_active()
    }
}
