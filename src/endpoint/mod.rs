// src/endpoint/mod.rs

mod http;
mod simulated;
mod types;


pub use http::HttpEndpoint;
pub use simulated::{SimulatedEndpoint, SimulatedMode};
pub use types::{ChatChoice, ChatCompletion, ChatCompletionRequest, ChatMessage, TokenUsage};

use super::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// The single outbound dependency: a chat-completion service
#[async_trait]
pub trait CompletionEndpoint: Send + Sync + Debug {
    /// Perform one completion call. The returned payload has already been
    /// checked against the expected schema.
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion>;

    /// Lightweight reachability check, distinct from a functional call
    async fn probe(&self) -> Result<()>;
}
