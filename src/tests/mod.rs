// src/tests/mod.rs


pub(crate) mod utils {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::client::ResilientClient;
    use crate::config::ClientConfig;
    use crate::endpoint::{CompletionEndpoint, SimulatedEndpoint};

    /// Small, fast settings for scenario tests
    pub fn test_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.retry.timeout = Duration::from_secs(1);
        config.retry.max_retries = 2;
        config.retry.base_delay = Duration::from_millis(10);
        config.rate_limit.max_concurrent_requests = 2;
        config.rate_limit.max_requests_per_minute = 100;
        config.cache.ttl = Duration::from_secs(60);
        config.shutdown.grace_period = Duration::from_secs(5);
        config
    }

    /// Client over `endpoint` with one health probe already recorded
    pub async fn probed_client(
        endpoint: Arc<dyn CompletionEndpoint>,
        config: ClientConfig,
    ) -> Arc<ResilientClient> {
        let client = Arc::new(ResilientClient::new(config, endpoint).unwrap());
        client.check_health().await;
        client
    }

    pub fn simulated(latency_ms: u64) -> Arc<SimulatedEndpoint> {
        Arc::new(SimulatedEndpoint::new().with_latency(Duration::from_millis(latency_ms)))
    }

    /// Yield until `client` has `n` calls in flight
    pub async fn wait_for_active(client: &ResilientClient, n: usize) {
        for _ in 0..1_000 {
            if client.active_requests() == n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {} active requests, saw {}",
            n,
            client.active_requests()
        );
    }
}
