use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,inference_client=trace
///
/// Set LOG_FORMAT=json for one JSON object per event. Output always goes to
/// stderr because stdout carries the response protocol.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(false),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_line_number(true),
                )
                .init();
        }

        tracing::info!("Logging initialized");
    });
}

/// Macro for logging the outcome of one `execute` call
#[macro_export]
macro_rules! request_event {
    ($request_id:expr, $cached:expr, $outcome:expr, $elapsed_ms:expr) => {
        tracing::info!(
            request_id = %$request_id,
            cached = $cached,
            outcome = $outcome,
            elapsed_ms = $elapsed_ms,
            "Request finished"
        )
    };
}

/// Macro for logging cache operations
#[macro_export]
macro_rules! cache_op {
    ($operation:expr, $key:expr, $hit:expr) => {
        tracing::debug!(
            operation = $operation,
            key = $key,
            hit = $hit,
            "Cache operation"
        )
    };
}
