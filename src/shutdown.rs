// src/shutdown.rs
//! Orderly shutdown: stop admitting, wait for in-flight calls, give up after
//! a grace period.

use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

use crate::client::ResilientClient;

/// How a drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight call finished
    Drained,
    /// The grace period ran out with calls still in flight
    TimedOut { remaining: usize },
}

/// Wait until no calls are in flight, at most `grace`.
///
/// Waits on the admission gate's active-count channel instead of polling.
pub async fn drain(client: &ResilientClient, grace: Duration) -> DrainOutcome {
    let mut active = client.subscribe_active();

    let wait = async {
        loop {
            let remaining = *active.borrow_and_update();
            if remaining == 0 {
                return;
            }
            info!(remaining, "Waiting for in-flight requests");
            if active.changed().await.is_err() {
                // Gate dropped, nothing left to wait for
                return;
            }
        }
    };

    match time::timeout(grace, wait).await {
        Ok(()) => {
            info!("All in-flight requests completed");
            DrainOutcome::Drained
        }
        Err(_) => {
            let remaining = client.active_requests();
            warn!(
                remaining,
                grace_ms = grace.as_millis() as u64,
                "Shutdown grace period elapsed, abandoning in-flight requests"
            );
            DrainOutcome::TimedOut { remaining }
        }
    }
}

/// `shutdown()` followed by [`drain`]
pub async fn graceful_shutdown(client: &ResilientClient, grace: Duration) -> DrainOutcome {
    client.shutdown();
    drain(client, grace).await
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
