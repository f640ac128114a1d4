use std::collections::HashMap;
use std::time::Duration;

use super::ClientConfig;
use crate::error::ClientError;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_defaults() {
    let config = ClientConfig::default();

    assert_eq!(config.endpoint.base_url, "http://localhost:1234/v1");
    assert_eq!(config.retry.timeout, Duration::from_secs(30));
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.health.check_timeout, Duration::from_secs(5));
    assert_eq!(config.health.stale_after, Duration::from_secs(10));
    assert!(config.cache.enabled);
    assert_eq!(config.rate_limit.max_requests_per_minute, 60);
    assert_eq!(config.rate_limit.max_concurrent_requests, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_json_partial_document_uses_defaults() {
    let config = ClientConfig::from_json(
        r#"{"endpoint": {"model": "qwen"}, "retry": {"timeout": 1500}, "cache": {"enabled": false}}"#,
    )
    .unwrap();

    assert_eq!(config.endpoint.model, "qwen");
    assert_eq!(config.endpoint.base_url, "http://localhost:1234/v1");
    assert_eq!(config.retry.timeout, Duration::from_millis(1500));
    assert_eq!(config.retry.max_retries, 3);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.ttl, Duration::from_secs(300));
}

#[test]
fn test_env_overrides() {
    let config = ClientConfig::from_lookup(lookup_from(&[
        ("INFERENCE_BASE_URL", "http://gpu-box:8080/v1"),
        ("INFERENCE_MAX_RETRIES", "5"),
        ("INFERENCE_RETRY_DELAY_MS", "250"),
        ("INFERENCE_CACHE_ENABLED", "false"),
        ("INFERENCE_MAX_CONCURRENT", "2"),
    ]))
    .unwrap();

    assert_eq!(config.endpoint.base_url, "http://gpu-box:8080/v1");
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    assert!(!config.cache.enabled);
    assert_eq!(config.rate_limit.max_concurrent_requests, 2);
}

#[test]
fn test_env_rejects_garbage() {
    let result = ClientConfig::from_lookup(lookup_from(&[("INFERENCE_TIMEOUT_MS", "soon")]));
    assert!(matches!(result, Err(ClientError::Config(_))));
}

#[test]
fn test_validate_rejects_zero_concurrency() {
    let mut config = ClientConfig::default();
    config.rate_limit.max_concurrent_requests = 0;
    assert!(matches!(config.validate(), Err(ClientError::Config(_))));
}

#[test]
fn test_durations_serialize_as_millis() {
    let config = ClientConfig::default();
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["retry"]["base_delay"], 1000);
    assert_eq!(value["shutdown"]["grace_period"], 30_000);
}
