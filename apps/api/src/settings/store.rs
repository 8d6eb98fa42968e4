use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};
use crate::config::Environment;
use crate::llm_client::Provider;

const SETTINGS_KEY: &str = "settings";

/// The persisted, non-secret part of the LLM configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub provider: Provider,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub model: String,
}

impl SettingsConfig {
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
        }
    }

    /// Built-in defaults overlaid with `LLM_PROVIDER`, `LLM_MODEL` and
    /// `LLM_BASE_URL`. Used as the store's first-run value.
    pub fn from_env(env: &dyn Environment) -> Self {
        let provider = match env.var("LLM_PROVIDER") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Ignoring LLM_PROVIDER: {e}");
                Provider::Ollama
            }),
            None => Provider::Ollama,
        };
        let mut settings = Self::for_provider(provider);
        if let Some(model) = env.var("LLM_MODEL") {
            settings.model = model;
        }
        if let Some(base_url) = env.var("LLM_BASE_URL") {
            settings.base_url = base_url;
        }
        settings
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self::for_provider(Provider::Ollama)
    }
}

/// A stored record may predate a field or have been edited by hand.
#[derive(Debug, Default, Deserialize)]
struct StoredSettings {
    provider: Option<Provider>,
    #[serde(rename = "baseURL")]
    base_url: Option<String>,
    model: Option<String>,
}

/// Settings persistence over whichever key-value backend was chosen at start-up.
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    defaults: SettingsConfig,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, defaults: SettingsConfig) -> Self {
        Self { kv, defaults }
    }

    /// Current settings. Never fails: unreadable state is logged and the
    /// defaults are returned instead.
    pub async fn get(&self) -> SettingsConfig {
        match self.kv.get(SETTINGS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<StoredSettings>(value) {
                Ok(stored) => self.merge(stored),
                Err(e) => {
                    warn!("Stored settings are unreadable, using defaults: {e}");
                    self.defaults.clone()
                }
            },
            Ok(None) => self.defaults.clone(),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {e}");
                self.defaults.clone()
            }
        }
    }

    pub async fn set(&self, settings: &SettingsConfig) -> Result<(), StorageError> {
        self.kv
            .set(SETTINGS_KEY, serde_json::to_value(settings)?)
            .await?;
        debug!("Saved settings: {:?}", settings);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.delete(SETTINGS_KEY).await
    }

    /// Fills missing fields. A missing `baseURL`/`model` comes from the
    /// defaults when the stored provider is the default provider, otherwise
    /// from that provider's built-in values.
    fn merge(&self, stored: StoredSettings) -> SettingsConfig {
        let provider = stored.provider.unwrap_or(self.defaults.provider);
        let fallback = if provider == self.defaults.provider {
            self.defaults.clone()
        } else {
            SettingsConfig::for_provider(provider)
        };
        SettingsConfig {
            provider,
            base_url: stored.base_url.unwrap_or(fallback.base_url),
            model: stored.model.unwrap_or(fallback.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn store_with(kv: Arc<MemoryStore>) -> SettingsStore {
        SettingsStore::new(kv, SettingsConfig::default())
    }

    #[tokio::test]
    async fn test_first_run_returns_defaults() {
        let store = store_with(Arc::new(MemoryStore::new()));
        assert_eq!(
            store.get().await,
            SettingsConfig {
                provider: Provider::Ollama,
                base_url: "http://localhost:11434/v1".into(),
                model: "llama3.1:8b".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let store = store_with(Arc::new(MemoryStore::new()));
        let cfg = SettingsConfig {
            provider: Provider::Claude,
            base_url: String::new(),
            model: "claude-3-5-sonnet-latest".into(),
        };
        store.set(&cfg).await.unwrap();
        assert_eq!(store.get().await, cfg);
    }

    #[tokio::test]
    async fn test_persisted_record_uses_original_field_names() {
        let kv = Arc::new(MemoryStore::new());
        let store = store_with(kv.clone());
        store.set(&SettingsConfig::for_provider(Provider::Groq)).await.unwrap();
        assert_eq!(
            kv.get(SETTINGS_KEY).await.unwrap(),
            Some(json!({
                "provider": "groq",
                "baseURL": "https://api.groq.com/openai/v1",
                "model": "llama-3.1-70b-versatile"
            }))
        );
    }

    #[tokio::test]
    async fn test_partial_record_merges_default_model() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(SETTINGS_KEY, json!({"provider": "ollama", "baseURL": "http://gpu-box:11434/v1"}))
            .await
            .unwrap();
        let settings = store_with(kv).get().await;
        assert_eq!(settings.base_url, "http://gpu-box:11434/v1");
        assert_eq!(settings.model, "llama3.1:8b");
    }

    #[tokio::test]
    async fn test_partial_record_for_other_provider_uses_its_defaults() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(SETTINGS_KEY, json!({"provider": "openai"})).await.unwrap();
        let settings = store_with(kv).get().await;
        assert_eq!(settings, SettingsConfig::for_provider(Provider::OpenAi));
    }

    #[tokio::test]
    async fn test_legacy_api_key_field_is_ignored() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            SETTINGS_KEY,
            json!({"provider": "gemini", "apiKey": "leaked", "baseURL": "", "model": "gemini-1.5-pro"}),
        )
        .await
        .unwrap();
        let settings = store_with(kv).get().await;
        assert_eq!(settings.provider, Provider::Gemini);
        assert_eq!(settings.model, "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_unknown_provider_falls_back_to_defaults() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(SETTINGS_KEY, json!({"provider": "mistral"})).await.unwrap();
        assert_eq!(store_with(kv).get().await, SettingsConfig::default());
    }

    #[tokio::test]
    async fn test_clear_reverts_to_defaults() {
        let store = store_with(Arc::new(MemoryStore::new()));
        store.set(&SettingsConfig::for_provider(Provider::OpenAi)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get().await, SettingsConfig::default());
    }

    #[test]
    fn test_defaults_from_env() {
        let env: HashMap<String, String> = [
            ("LLM_PROVIDER".to_string(), "groq".to_string()),
            ("LLM_MODEL".to_string(), "llama-3.3-70b-versatile".to_string()),
        ]
        .into();
        let settings = SettingsConfig::from_env(&env);
        assert_eq!(settings.provider, Provider::Groq);
        assert_eq!(settings.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_invalid_env_provider_is_ignored() {
        let env: HashMap<String, String> =
            [("LLM_PROVIDER".to_string(), "skynet".to_string())].into();
        assert_eq!(SettingsConfig::from_env(&env), SettingsConfig::default());
    }
}
