// library entry
pub mod admission;
pub mod cache;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod resilience;
pub mod shutdown;

#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use client::{ExecuteOptions, Metrics, ResilientClient};
pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind, Result};
pub use logging::init as init_logging;
pub use resilience::{HealthSnapshot, HealthStatus};
pub use shutdown::{drain, graceful_shutdown, DrainOutcome};
