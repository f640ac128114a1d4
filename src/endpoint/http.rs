// src/endpoint/http.rs

use async_trait::async_trait;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::endpoint::{ChatCompletion, ChatCompletionRequest, CompletionEndpoint};
use crate::error::{RemoteError, Result};

/// OpenAI-compatible HTTP endpoint
///
/// Deadlines are not configured on the reqwest client; the retrying executor
/// and the health monitor bound every call themselves.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpEndpoint {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl CompletionEndpoint for HttpEndpoint {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let completion: ChatCompletion = serde_json::from_str(&body)?;
        completion.validate()?;

        debug!(
            model = %completion.model,
            choices = completion.choices.len(),
            "Completion received"
        );
        Ok(completion)
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }
        Ok(())
    }
}
