use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Config, Environment, StorageBackend};
use crate::llm_client::LlmClient;
use crate::settings::{
    ConfigResolver, CredentialStore, JsonFileStore, KeyValueStore, KeyringVault, MemoryStore,
    PlainCredentialStore, SettingsConfig, SettingsStore, VaultCredentialStore,
};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<SettingsStore>,
    /// Keychain-backed on desktop, plaintext slots otherwise.
    pub secrets: Arc<dyn CredentialStore>,
    pub resolver: ConfigResolver,
    pub llm: LlmClient,
    pub config: Config,
}

impl AppState {
    /// Wires the stores for the configured backend. Called once from `main`.
    pub fn build(config: Config, env: Arc<dyn Environment>) -> Result<Self> {
        let (kv, secrets): (Arc<dyn KeyValueStore>, Arc<dyn CredentialStore>) =
            match config.storage_backend {
                StorageBackend::Desktop => {
                    let kv: Arc<dyn KeyValueStore> =
                        Arc::new(JsonFileStore::new(config.settings_path()));
                    let vault = Arc::new(KeyringVault::new(config.keychain_service.clone()));
                    let secrets: Arc<dyn CredentialStore> =
                        Arc::new(VaultCredentialStore::new(vault, kv.clone()));
                    (kv, secrets)
                }
                StorageBackend::Web => {
                    warn!("Web storage backend: API keys are stored WITHOUT encryption");
                    let kv: Arc<dyn KeyValueStore> =
                        Arc::new(JsonFileStore::new(config.settings_path()));
                    let secrets: Arc<dyn CredentialStore> = Arc::new(PlainCredentialStore::new(kv.clone()));
                    (kv, secrets)
                }
                StorageBackend::Memory => {
                    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
                    let secrets: Arc<dyn CredentialStore> = Arc::new(PlainCredentialStore::new(kv.clone()));
                    (kv, secrets)
                }
            };

        match config.storage_backend {
            StorageBackend::Memory => info!("Storage backend: memory (nothing is persisted)"),
            backend => info!(
                "Storage backend: {:?} ({})",
                backend,
                config.settings_path().display()
            ),
        }

        let llm = LlmClient::new(Duration::from_secs(config.llm_timeout_secs))
            .context("Failed to build HTTP client")?;

        Ok(Self::from_parts(kv, secrets, env, llm, config))
    }

    pub fn from_parts(
        kv: Arc<dyn KeyValueStore>,
        secrets: Arc<dyn CredentialStore>,
        env: Arc<dyn Environment>,
        llm: LlmClient,
        config: Config,
    ) -> Self {
        let defaults = SettingsConfig::from_env(env.as_ref());
        info!(
            "Default provider: {} (model: {})",
            defaults.provider, defaults.model
        );
        let settings = Arc::new(SettingsStore::new(kv, defaults));
        let resolver = ConfigResolver::new(settings.clone(), secrets.clone(), env);
        Self {
            settings,
            secrets,
            resolver,
            llm,
            config,
        }
    }
}
