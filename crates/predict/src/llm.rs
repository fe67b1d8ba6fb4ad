//! Generation service seam: LlmClient trait, request types, AnthropicClient.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failure talking to the generation service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    /// Network or transport failure.
    #[error("generation service network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("generation service API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service returned no usable text.
    #[error("generation service returned an empty response")]
    EmptyResponse,

    /// The service's envelope (not the model text) could not be decoded.
    #[error("generation service returned an unreadable payload: {0}")]
    InvalidPayload(String),

    /// No response within the configured bound.
    #[error("generation service timed out after {0:?}")]
    Timeout(Duration),

    /// The client is missing credentials or is otherwise misconfigured.
    #[error("generation client misconfigured: {0}")]
    Config(String),
}

/// A message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Everything the generation service needs for one completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for calling an LLM to get a text completion.
///
/// Implementations handle the specifics of the provider API. The pipeline
/// handles prompt construction, timeouts, and response normalization.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Client used when no real client could be configured. Every call fails
/// with the stored error, so the pipeline answers with the fallback record.
#[derive(Debug, Clone)]
pub struct UnavailableClient(pub LlmError);

#[async_trait]
impl LlmClient for UnavailableClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        Err(self.0.clone())
    }
}

// -- AnthropicClient (feature-gated) --

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicClient, AnthropicConfig};

#[cfg(feature = "anthropic")]
mod anthropic {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    use super::{CompletionRequest, LlmClient, LlmError, Message};

    /// Default Anthropic API base URL.
    pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

    /// Required API version header value.
    const ANTHROPIC_VERSION: &str = "2023-06-01";

    /// Connection settings for [`AnthropicClient`].
    #[derive(Debug, Clone)]
    pub struct AnthropicConfig {
        pub api_key: String,
        /// Base URL (default: https://api.anthropic.com).
        pub base_url: String,
        /// Transport-level timeout for a single HTTP exchange.
        pub http_timeout: Duration,
    }

    impl AnthropicConfig {
        pub fn new(api_key: impl Into<String>) -> Self {
            Self {
                api_key: api_key.into(),
                base_url: DEFAULT_BASE_URL.to_string(),
                http_timeout: Duration::from_secs(60),
            }
        }
    }

    #[derive(Serialize)]
    struct MessagesRequest<'a> {
        model: &'a str,
        max_tokens: u32,
        temperature: f32,
        messages: &'a [Message],
    }

    #[derive(Deserialize)]
    struct MessagesResponse {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        text: Option<String>,
    }

    /// Generation client for the Anthropic Messages API.
    ///
    /// Uses `ureq` for HTTP inside `spawn_blocking`.
    pub struct AnthropicClient {
        config: AnthropicConfig,
    }

    impl AnthropicClient {
        pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
            if config.api_key.trim().is_empty() {
                return Err(LlmError::Config("Anthropic API key is empty".to_string()));
            }
            Ok(Self { config })
        }
    }

    #[async_trait]
    impl LlmClient for AnthropicClient {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            let config = self.config.clone();

            tokio::task::spawn_blocking(move || {
                let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));
                let body = MessagesRequest {
                    model: &request.model,
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                    messages: &request.messages,
                };

                let agent: ureq::Agent = ureq::Agent::config_builder()
                    .timeout_global(Some(config.http_timeout))
                    .build()
                    .into();
                let response = agent
                    .post(&url)
                    .header("x-api-key", &config.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("content-type", "application/json")
                    .send_json(&body)
                    .map_err(|e| match e {
                        ureq::Error::StatusCode(status) => LlmError::Api {
                            status,
                            message: format!("POST {} returned HTTP {}", url, status),
                        },
                        other => LlmError::Network(other.to_string()),
                    })?;

                let parsed: MessagesResponse = response
                    .into_body()
                    .read_json()
                    .map_err(|e| LlmError::InvalidPayload(e.to_string()))?;

                let text: String = parsed
                    .content
                    .into_iter()
                    .filter_map(|block| block.text)
                    .collect::<Vec<_>>()
                    .join("");
                if text.trim().is_empty() {
                    return Err(LlmError::EmptyResponse);
                }
                Ok(text)
            })
            .await
            .map_err(|e| LlmError::Network(format!("task join error: {}", e)))?
        }
    }

}
