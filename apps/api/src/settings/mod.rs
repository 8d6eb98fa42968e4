//! Settings and secrets: everything that decides which provider a request
//! goes to and with which credentials.
//!
//! Layers, leaves first:
//!   kv: key-value persistence (JSON file or in-memory)
//!   store: the `{provider, baseURL, model}` record
//!   secrets: per-provider API keys (OS keychain, insecure fallback)
//!   resolver: composes the above with env vars into an `LlmConfig`

use thiserror::Error;

pub mod handlers;
pub mod kv;
pub mod resolver;
pub mod secrets;
pub mod store;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use resolver::{ConfigOverrides, ConfigResolver, KeySource};
pub use secrets::{
    CredentialStore, KeyProtection, KeyringVault, PlainCredentialStore, SecretVault,
    VaultCredentialStore,
};
pub use store::{SettingsConfig, SettingsStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(String),
}
