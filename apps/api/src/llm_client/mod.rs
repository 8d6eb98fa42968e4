/// LLM Client: the single point of entry for all chat-completion calls.
///
/// No other module talks to a provider API directly. Dispatch is a `match`
/// over [`Provider`]; each provider speaks one wire format and one auth
/// scheme, defined in `providers.rs`.
///
/// Every call is one request. Nothing here retries: failures are surfaced
/// once per attempt and the caller decides what to do.
use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod providers;
pub mod status;

pub use ollama::ModelListing;
pub use providers::{AuthScheme, Provider, ProviderInfo, WireFormat};
pub use status::ConnectionStatus;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} requires an API key: {hint}")]
    Auth { provider: Provider, hint: String },

    #[error("{provider} API error (status {status}): {body}")]
    Provider {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("Could not reach {provider}: {message}")]
    Transport { provider: Provider, message: String },

    #[error("Unexpected response from {provider}: {message}")]
    Parse { provider: Provider, message: String },
}

impl LlmError {
    /// Only network failures are worth a manual retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transport { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Fully resolved configuration for one request.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LlmConfig {
    pub provider: Provider,
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub model: String,
}

impl LlmConfig {
    /// Built-in defaults for a provider, with no key.
    pub fn defaults_for(provider: Provider) -> Self {
        Self {
            provider,
            api_key: String::new(),
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
        }
    }

    /// Endpoint root, falling back to the provider default when blank.
    pub fn endpoint_root(&self) -> &str {
        let base = self.base_url.trim();
        if base.is_empty() {
            self.provider.default_base_url()
        } else {
            base
        }
    }

    fn model_or_default(&self) -> &str {
        let model = self.model.trim();
        if model.is_empty() {
            self.provider.default_model()
        } else {
            model
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Shared HTTP client for every provider. Cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
}

impl LlmClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Sends `messages` to the configured provider and returns the first
    /// completion's text, or an empty string when the provider sent none.
    pub async fn create_completion(
        &self,
        messages: &[ChatMessage],
        config: &LlmConfig,
    ) -> Result<String, LlmError> {
        ensure_api_key(config)?;

        let model = config.model_or_default();
        debug!(
            "Dispatching completion to {} (model: {}, messages: {})",
            config.provider,
            model,
            messages.len()
        );

        let request = match config.provider.wire_format() {
            WireFormat::OpenAiChat => {
                let url = join_url(config.endpoint_root(), "chat/completions");
                self.client
                    .post(url)
                    .json(&openai::ChatRequest::new(model, messages))
            }
            WireFormat::AnthropicMessages => {
                let url = join_url(config.endpoint_root(), "messages");
                self.client
                    .post(url)
                    .json(&anthropic::MessagesRequest::new(model, messages))
            }
        };

        let response = send_checked(config.provider, authorize(request, config)).await?;

        let content = match config.provider.wire_format() {
            WireFormat::OpenAiChat => openai::read_completion(config.provider, response).await?,
            WireFormat::AnthropicMessages => {
                anthropic::read_completion(config.provider, response).await?
            }
        };

        debug!(
            "{} completion returned {} chars",
            config.provider,
            content.len()
        );
        Ok(content)
    }

    /// Cheapest request that proves the provider is reachable and the key is
    /// accepted. Never fails: every error is folded into the status.
    pub async fn test_connection(&self, config: &LlmConfig) -> ConnectionStatus {
        let provider = config.provider;

        if let Err(e) = ensure_api_key(config) {
            return ConnectionStatus::failed(e.to_string());
        }

        let root = config.endpoint_root();
        if let Err(message) = status::validate_base_url(root) {
            return ConnectionStatus::failed(message);
        }

        let request = match provider {
            Provider::Ollama => self.client.get(join_url(&ollama::server_root(root), "api/tags")),
            Provider::OpenAi | Provider::Groq | Provider::Gemini => {
                self.client.get(join_url(root, "models"))
            }
            Provider::Claude => self
                .client
                .post(join_url(root, "messages"))
                .json(&anthropic::MessagesRequest::probe(config.model_or_default())),
        };

        debug!("Testing {} connection at {}", provider, root);

        match authorize(request, config).send().await {
            Ok(response) if response.status().is_success() => ConnectionStatus::ok(),
            Ok(response) => {
                let code = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let status = ConnectionStatus::failed(status::classify_status(provider, code, &body));
                warn!("{} connection test failed: {:?}", provider, status.error);
                status
            }
            Err(e) => {
                let status = ConnectionStatus::failed(status::classify_transport(provider, root, &e));
                warn!("{} connection test failed: {:?}", provider, status.error);
                status
            }
        }
    }

    /// Lists models installed on a local Ollama server.
    pub async fn list_models(&self, base_url: &str) -> ModelListing {
        ollama::list_models(&self.client, base_url).await
    }
}

/// Rejects hosted-provider requests without a key before touching the network.
fn ensure_api_key(config: &LlmConfig) -> Result<(), LlmError> {
    if config.provider.requires_api_key() && config.api_key.trim().is_empty() {
        return Err(LlmError::Auth {
            provider: config.provider,
            hint: config.provider.missing_key_hint(),
        });
    }
    Ok(())
}

fn authorize(request: RequestBuilder, config: &LlmConfig) -> RequestBuilder {
    let key = config.api_key.trim();
    match config.provider.auth_scheme() {
        AuthScheme::None => request,
        AuthScheme::Bearer => request.bearer_auth(key),
        AuthScheme::AnthropicKey => request
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION),
    }
}

/// Sends the request and turns any non-2xx status into `LlmError::Provider`.
async fn send_checked(provider: Provider, request: RequestBuilder) -> Result<Response, LlmError> {
    let response = request.send().await.map_err(|e| LlmError::Transport {
        provider,
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("{} API returned {}: {}", provider, status, body);
        return Err(LlmError::Provider {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

pub(crate) fn join_url(root: &str, path: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
