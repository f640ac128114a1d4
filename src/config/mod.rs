// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClientError, Result};

#[cfg(test)]
mod tests;

/// Top-level configuration for the resilient client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub health: HealthSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub shutdown: ShutdownSettings,
}

/// Where the inference endpoint lives and how to authenticate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL, e.g. `http://localhost:1234/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential sent with every request
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Model identifier placed in every completion request
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_api_key() -> String {
    "not-needed".to_string()
}

fn default_model() -> String {
    "local-model".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            model: default_model(),
        }
    }
}

/// Per-attempt deadline and retry schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Deadline for a single attempt
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Additional attempts after the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay; the n-th retry waits `min(base * n, base * 3)`
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub base_delay: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            base_delay: default_retry_delay(),
        }
    }
}

/// Health probing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// How often the background probe runs
    #[serde(default = "default_check_interval", with = "duration_serde")]
    pub check_interval: Duration,

    /// Deadline for one probe
    #[serde(default = "default_check_timeout", with = "duration_serde")]
    pub check_timeout: Duration,

    /// Age after which an unhealthy reading is re-probed from the call path
    #[serde(default = "default_stale_after", with = "duration_serde")]
    pub stale_after: Duration,
}

fn default_check_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_stale_after() -> Duration {
    Duration::from_secs(10)
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            check_timeout: default_check_timeout(),
            stale_after: default_stale_after(),
        }
    }
}

/// Response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time-to-live of a stored response
    #[serde(default = "default_cache_ttl", with = "duration_serde")]
    pub ttl: Duration,

    /// How often expired entries are swept
    #[serde(default = "default_cleanup_interval", with = "duration_serde")]
    pub cleanup_interval: Duration,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_cache_ttl(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

/// Admission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Admissions allowed within the trailing 60 seconds
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: usize,

    /// Calls allowed in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

fn default_max_requests_per_minute() -> usize {
    60
}

fn default_max_concurrent() -> usize {
    10
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests_per_minute: default_max_requests_per_minute(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

/// Shutdown drain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownSettings {
    /// Upper bound on how long shutdown waits for in-flight calls
    #[serde(default = "default_grace_period", with = "duration_serde")]
    pub grace_period: Duration,
}

fn default_grace_period() -> Duration {
    Duration::from_secs(30)
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document; missing fields fall back to defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ClientError::Config(format!("invalid config document: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `INFERENCE_*` environment variables.
    ///
    /// Durations are given in milliseconds.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("INFERENCE_BASE_URL") {
            config.endpoint.base_url = v;
        }
        if let Some(v) = lookup("INFERENCE_API_KEY") {
            config.endpoint.api_key = v;
        }
        if let Some(v) = lookup("INFERENCE_MODEL") {
            config.endpoint.model = v;
        }

        override_millis(&lookup, "INFERENCE_TIMEOUT_MS", &mut config.retry.timeout)?;
        override_parsed(&lookup, "INFERENCE_MAX_RETRIES", &mut config.retry.max_retries)?;
        override_millis(&lookup, "INFERENCE_RETRY_DELAY_MS", &mut config.retry.base_delay)?;

        override_millis(
            &lookup,
            "INFERENCE_HEALTH_INTERVAL_MS",
            &mut config.health.check_interval,
        )?;
        override_millis(
            &lookup,
            "INFERENCE_HEALTH_TIMEOUT_MS",
            &mut config.health.check_timeout,
        )?;

        override_parsed(&lookup, "INFERENCE_CACHE_ENABLED", &mut config.cache.enabled)?;
        override_millis(&lookup, "INFERENCE_CACHE_TTL_MS", &mut config.cache.ttl)?;
        override_millis(
            &lookup,
            "INFERENCE_CACHE_CLEANUP_MS",
            &mut config.cache.cleanup_interval,
        )?;

        override_parsed(
            &lookup,
            "INFERENCE_RATE_LIMIT_ENABLED",
            &mut config.rate_limit.enabled,
        )?;
        override_parsed(
            &lookup,
            "INFERENCE_MAX_REQUESTS_PER_MINUTE",
            &mut config.rate_limit.max_requests_per_minute,
        )?;
        override_parsed(
            &lookup,
            "INFERENCE_MAX_CONCURRENT",
            &mut config.rate_limit.max_concurrent_requests,
        )?;

        override_millis(
            &lookup,
            "INFERENCE_SHUTDOWN_GRACE_MS",
            &mut config.shutdown.grace_period,
        )?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".to_string()));
        }
        if self.retry.timeout.is_zero() {
            return Err(ClientError::Config("timeout must be non-zero".to_string()));
        }
        if self.health.check_timeout.is_zero() || self.health.check_interval.is_zero() {
            return Err(ClientError::Config(
                "health check interval and timeout must be non-zero".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.cleanup_interval.is_zero() {
            return Err(ClientError::Config(
                "cache cleanup interval must be non-zero".to_string(),
            ));
        }
        if self.rate_limit.max_concurrent_requests == 0 {
            return Err(ClientError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.max_requests_per_minute == 0 {
            return Err(ClientError::Config(
                "max_requests_per_minute must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, name: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ClientError::Config(format!("{} has invalid value '{}'", name, raw)))?;
    }
    Ok(())
}

fn override_millis<F>(lookup: &F, name: &str, target: &mut Duration) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let mut millis = target.as_millis() as u64;
    override_parsed(lookup, name, &mut millis)?;
    *target = Duration::from_millis(millis);
    Ok(())
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
