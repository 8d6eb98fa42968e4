//! Configuration resolution: decides the effective `LlmConfig` for a request.
//!
//! Per field, highest priority first:
//!   1. request-scoped override (unsaved settings-form values)
//!   2. stored secret (api key) / stored settings (provider, baseURL, model)
//!   3. environment: the provider's key variable, then `LLM_API_KEY`
//!   4. built-in provider defaults, empty key
//!
//! Inputs are re-read on every call; nothing is cached. Resolution never
//! fails. Whether the result is usable is the dispatcher's call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CredentialStore, SettingsConfig, SettingsStore};
use crate::config::Environment;
use crate::llm_client::{LlmConfig, Provider};

const GENERIC_API_KEY_ENV: &str = "LLM_API_KEY";

/// Values supplied with a single request that take precedence over
/// everything persisted. Blank strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    #[serde(default, rename = "apiKey", alias = "api_key")]
    pub api_key: Option<String>,
    #[serde(default, rename = "baseURL", alias = "base_url")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Where a resolved API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Override,
    Stored,
    Environment,
    NotRequired,
    Missing,
}

#[derive(Clone)]
pub struct ConfigResolver {
    settings: Arc<SettingsStore>,
    secrets: Arc<dyn CredentialStore>,
    env: Arc<dyn Environment>,
}

impl ConfigResolver {
    pub fn new(
        settings: Arc<SettingsStore>,
        secrets: Arc<dyn CredentialStore>,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self {
            settings,
            secrets,
            env,
        }
    }

    /// Effective config for the override's provider, or the saved one.
    pub async fn resolve(&self, overrides: &ConfigOverrides) -> LlmConfig {
        let stored = self.settings.get().await;
        let provider = overrides.provider.unwrap_or(stored.provider);
        self.resolve_with(provider, &stored, overrides).await
    }

    /// Effective config for a specific provider regardless of which one is
    /// currently selected (connection tests of non-selected providers).
    pub async fn resolve_for(&self, provider: Provider, overrides: &ConfigOverrides) -> LlmConfig {
        let stored = self.settings.get().await;
        self.resolve_with(provider, &stored, overrides).await
    }

    async fn resolve_with(
        &self,
        provider: Provider,
        stored: &SettingsConfig,
        overrides: &ConfigOverrides,
    ) -> LlmConfig {
        // Saved baseURL/model belong to the saved provider only.
        let (stored_base_url, stored_model) = if stored.provider == provider {
            (non_blank(&stored.base_url), non_blank(&stored.model))
        } else {
            (None, None)
        };

        let base_url = overrides
            .base_url
            .as_deref()
            .and_then(non_blank)
            .or(stored_base_url)
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let model = overrides
            .model
            .as_deref()
            .and_then(non_blank)
            .or(stored_model)
            .unwrap_or_else(|| provider.default_model().to_string());

        let (api_key, source) = match overrides.api_key.as_deref().and_then(non_blank) {
            Some(key) if provider.requires_api_key() => (key, KeySource::Override),
            _ => self.api_key_with_source(provider).await,
        };

        debug!(
            "Resolved {} config (model: {}, key source: {:?})",
            provider, model, source
        );

        LlmConfig {
            provider,
            api_key,
            base_url,
            model,
        }
    }

    /// Persisted or environment key for a provider, with its origin.
    pub async fn api_key_with_source(&self, provider: Provider) -> (String, KeySource) {
        let Some(env_name) = provider.api_key_env() else {
            return (String::new(), KeySource::NotRequired);
        };

        match self.secrets.get_api_key(provider).await {
            Ok(Some(key)) if !key.trim().is_empty() => return (key, KeySource::Stored),
            Ok(_) => {}
            Err(e) => warn!("Failed to read stored {provider} API key: {e}"),
        }

        match self.env_api_key(env_name) {
            Some(key) => (key, KeySource::Environment),
            None => (String::new(), KeySource::Missing),
        }
    }

    fn env_api_key(&self, env_name: &str) -> Option<String> {
        self.env
            .var(env_name)
            .or_else(|| self.env.var(GENERIC_API_KEY_ENV))
    }

    /// Whether a hosted provider would still get a key from the environment
    /// with nothing stored. Always true for providers that need none.
    pub fn has_env_fallback(&self, provider: Provider) -> bool {
        match provider.api_key_env() {
            Some(name) => self.env_api_key(name).is_some(),
            None => true,
        }
    }

    /// Whether the provider's own environment variable is set. The generic
    /// `LLM_API_KEY` is not reported here.
    pub fn env_key_present(&self, provider: Provider) -> bool {
        provider
            .api_key_env()
            .is_some_and(|name| self.env.var(name).is_some())
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
