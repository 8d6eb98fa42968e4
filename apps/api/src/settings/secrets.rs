//! Per-provider API key storage.
//!
//! The desktop store prefers the OS keychain. When the keychain cannot be
//! used the key is still persisted, but in a separately named plaintext slot,
//! and the caller is told so via [`KeyProtection::Insecure`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};
use crate::llm_client::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyProtection {
    Encrypted,
    Insecure,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn set_api_key(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<KeyProtection, StorageError>;
    async fn get_api_key(&self, provider: Provider) -> Result<Option<String>, StorageError>;
    /// Removes every slot for the provider. Absent keys are not an error.
    async fn delete_api_key(&self, provider: Provider) -> Result<(), StorageError>;
}

fn account_name(provider: Provider) -> String {
    format!("career-compass-{provider}")
}

// ────────────────────────────────────────────────────────────────────────────
// OS keychain
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("keychain unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failure(String),
}

/// Blocking access to OS-protected secret storage.
pub trait SecretVault: Send + Sync + 'static {
    fn store(&self, account: &str, secret: &str) -> Result<(), VaultError>;
    fn load(&self, account: &str) -> Result<Option<String>, VaultError>;
    /// Removing an absent entry is not an error.
    fn remove(&self, account: &str) -> Result<(), VaultError>;
}

/// Keychain / Credential Manager / Secret Service via the `keyring` crate.
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, VaultError> {
        keyring::Entry::new(&self.service, account).map_err(map_keyring_error)
    }
}

fn map_keyring_error(e: keyring::Error) -> VaultError {
    match e {
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
            VaultError::Unavailable(e.to_string())
        }
        other => VaultError::Failure(other.to_string()),
    }
}

impl SecretVault for KeyringVault {
    fn store(&self, account: &str, secret: &str) -> Result<(), VaultError> {
        self.entry(account)?
            .set_password(secret)
            .map_err(map_keyring_error)
    }

    fn load(&self, account: &str) -> Result<Option<String>, VaultError> {
        match self.entry(account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn remove(&self, account: &str) -> Result<(), VaultError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_keyring_error(e)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// VaultCredentialStore (desktop)
// ────────────────────────────────────────────────────────────────────────────

pub struct VaultCredentialStore {
    vault: Arc<dyn SecretVault>,
    kv: Arc<dyn KeyValueStore>,
}

impl VaultCredentialStore {
    pub fn new(vault: Arc<dyn SecretVault>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self { vault, kv }
    }

    fn insecure_slot(provider: Provider) -> String {
        format!("insecure:{}", account_name(provider))
    }

    async fn with_vault<T, F>(&self, f: F) -> Result<T, VaultError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SecretVault) -> Result<T, VaultError> + Send + 'static,
    {
        let vault = self.vault.clone();
        tokio::task::spawn_blocking(move || f(vault.as_ref()))
            .await
            .map_err(|e| VaultError::Failure(format!("keychain task failed: {e}")))?
    }
}

#[async_trait]
impl CredentialStore for VaultCredentialStore {
    async fn set_api_key(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<KeyProtection, StorageError> {
        let account = account_name(provider);
        let secret = api_key.to_string();

        match self.with_vault(move |v| v.store(&account, &secret)).await {
            Ok(()) => {
                if let Err(e) = self.kv.delete(&Self::insecure_slot(provider)).await {
                    warn!("Stale plaintext key for {provider} could not be removed: {e}");
                }
                debug!("Stored {provider} API key in the OS keychain");
                Ok(KeyProtection::Encrypted)
            }
            Err(VaultError::Unavailable(e)) => {
                warn!(
                    "OS keychain not usable ({e}); storing {provider} API key WITHOUT encryption"
                );
                self.kv
                    .set(
                        &Self::insecure_slot(provider),
                        Value::String(api_key.to_string()),
                    )
                    .await?;
                // An older encrypted entry would shadow the new plaintext slot.
                let account = account_name(provider);
                if let Err(e) = self.with_vault(move |v| v.remove(&account)).await {
                    debug!("Could not clear keychain entry for {provider}: {e}");
                }
                Ok(KeyProtection::Insecure)
            }
            Err(VaultError::Failure(e)) => Err(StorageError::Keychain(format!(
                "failed to store {provider} API key: {e}"
            ))),
        }
    }

    async fn get_api_key(&self, provider: Provider) -> Result<Option<String>, StorageError> {
        let account = account_name(provider);
        match self.with_vault(move |v| v.load(&account)).await {
            Ok(Some(secret)) => return Ok(Some(secret)),
            Ok(None) => {}
            Err(VaultError::Unavailable(e)) => debug!("Keychain unavailable for {provider}: {e}"),
            Err(e) => warn!("Keychain lookup for {provider} failed: {e}"),
        }

        Ok(self
            .kv
            .get(&Self::insecure_slot(provider))
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn delete_api_key(&self, provider: Provider) -> Result<(), StorageError> {
        let account = account_name(provider);
        let removed = self.with_vault(move |v| v.remove(&account)).await;
        self.kv.delete(&Self::insecure_slot(provider)).await?;
        match removed {
            Ok(()) => Ok(()),
            Err(VaultError::Unavailable(e)) => {
                debug!("Keychain unavailable during delete: {e}");
                Ok(())
            }
            Err(VaultError::Failure(e)) => Err(StorageError::Keychain(format!(
                "failed to remove {provider} API key: {e}"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PlainCredentialStore (web)
// ────────────────────────────────────────────────────────────────────────────

/// Plaintext key slots in the key-value store. Functional, not secure.
pub struct PlainCredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl PlainCredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn slot(provider: Provider) -> String {
        format!("career-compass-key-{provider}")
    }
}

#[async_trait]
impl CredentialStore for PlainCredentialStore {
    async fn set_api_key(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<KeyProtection, StorageError> {
        self.kv
            .set(&Self::slot(provider), Value::String(api_key.to_string()))
            .await?;
        Ok(KeyProtection::Insecure)
    }

    async fn get_api_key(&self, provider: Provider) -> Result<Option<String>, StorageError> {
        Ok(self
            .kv
            .get(&Self::slot(provider))
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn delete_api_key(&self, provider: Provider) -> Result<(), StorageError> {
        self.kv.delete(&Self::slot(provider)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-process stand-in for the OS keychain.
    #[derive(Default)]
    pub(crate) struct FakeVault {
        entries: Mutex<HashMap<String, String>>,
        available: bool,
        fail_store: bool,
        fail_load: bool,
        fail_remove: bool,
    }

    impl FakeVault {
        pub(crate) fn available() -> Self {
            Self {
                available: true,
                ..Default::default()
            }
        }

        pub(crate) fn unavailable() -> Self {
            Self::default()
        }

        /// Reachable, but every write is refused.
        pub(crate) fn read_only() -> Self {
            Self {
                fail_store: true,
                fail_remove: true,
                ..Self::available()
            }
        }

        pub(crate) fn with_entry(self, account: &str, secret: &str) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(account.to_string(), secret.to_string());
            self
        }

        fn check(&self, failing: bool) -> Result<(), VaultError> {
            if !self.available {
                Err(VaultError::Unavailable("no secret service".into()))
            } else if failing {
                Err(VaultError::Failure("access denied".into()))
            } else {
                Ok(())
            }
        }
    }

    impl SecretVault for FakeVault {
        fn store(&self, account: &str, secret: &str) -> Result<(), VaultError> {
            self.check(self.fail_store)?;
            self.entries
                .lock()
                .unwrap()
                .insert(account.to_string(), secret.to_string());
            Ok(())
        }

        fn load(&self, account: &str) -> Result<Option<String>, VaultError> {
            self.check(self.fail_load)?;
            Ok(self.entries.lock().unwrap().get(account).cloned())
        }

        fn remove(&self, account: &str) -> Result<(), VaultError> {
            self.check(self.fail_remove)?;
            self.entries.lock().unwrap().remove(account);
            Ok(())
        }
    }

    fn vault_store(vault: Arc<FakeVault>, kv: Arc<MemoryStore>) -> VaultCredentialStore {
        VaultCredentialStore::new(vault, kv)
    }

    #[tokio::test]
    async fn test_encrypted_roundtrip() {
        let vault = Arc::new(FakeVault::available());
        let kv = Arc::new(MemoryStore::new());
        let store = vault_store(vault.clone(), kv.clone());

        let protection = store.set_api_key(Provider::OpenAi, "sk-123").await.unwrap();
        assert_eq!(protection, KeyProtection::Encrypted);
        assert_eq!(
            store.get_api_key(Provider::OpenAi).await.unwrap().as_deref(),
            Some("sk-123")
        );
        assert_eq!(kv.get("insecure:career-compass-openai").await.unwrap(), None);
        assert!(vault.entries.lock().unwrap().contains_key("career-compass-openai"));
    }

    #[tokio::test]
    async fn test_unavailable_keychain_still_persists_insecurely() {
        let kv = Arc::new(MemoryStore::new());
        let store = vault_store(Arc::new(FakeVault::unavailable()), kv.clone());

        let protection = store.set_api_key(Provider::Groq, "gsk-1").await.unwrap();
        assert_eq!(protection, KeyProtection::Insecure);
        assert_eq!(
            kv.get("insecure:career-compass-groq").await.unwrap(),
            Some(Value::String("gsk-1".into()))
        );
        assert_eq!(
            store.get_api_key(Provider::Groq).await.unwrap().as_deref(),
            Some("gsk-1")
        );
    }

    #[tokio::test]
    async fn test_encrypted_slot_wins_over_insecure_slot() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("insecure:career-compass-claude", Value::String("old".into()))
            .await
            .unwrap();
        let vault = Arc::new(FakeVault::available());
        vault
            .store("career-compass-claude", "new")
            .unwrap();

        let store = vault_store(vault, kv);
        assert_eq!(
            store.get_api_key(Provider::Claude).await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn test_encrypted_write_clears_stale_insecure_slot() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("insecure:career-compass-gemini", Value::String("old".into()))
            .await
            .unwrap();
        let store = vault_store(Arc::new(FakeVault::available()), kv.clone());

        store.set_api_key(Provider::Gemini, "fresh").await.unwrap();
        assert_eq!(kv.get("insecure:career-compass-gemini").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_both_slots_and_is_idempotent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("insecure:career-compass-openai", Value::String("a".into()))
            .await
            .unwrap();
        let vault = Arc::new(FakeVault::available());
        vault.store("career-compass-openai", "b").unwrap();
        let store = vault_store(vault, kv);

        store.delete_api_key(Provider::OpenAi).await.unwrap();
        assert_eq!(store.get_api_key(Provider::OpenAi).await.unwrap(), None);
        store.delete_api_key(Provider::OpenAi).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let store = vault_store(Arc::new(FakeVault::unavailable()), Arc::new(MemoryStore::new()));
        assert_eq!(store.get_api_key(Provider::Claude).await.unwrap(), None);
        store.delete_api_key(Provider::Claude).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_keychain_delete_is_reported() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("insecure:career-compass-openai", Value::String("plain".into()))
            .await
            .unwrap();
        let vault = Arc::new(FakeVault::read_only().with_entry("career-compass-openai", "sk-OLD"));
        let store = vault_store(vault, kv.clone());

        let err = store.delete_api_key(Provider::OpenAi).await.unwrap_err();
        assert!(matches!(err, StorageError::Keychain(_)));
        // The plaintext slot is still cleared.
        assert_eq!(kv.get("insecure:career-compass-openai").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_keychain_write_keeps_previous_key() {
        let kv = Arc::new(MemoryStore::new());
        let vault = Arc::new(FakeVault::read_only().with_entry("career-compass-openai", "sk-OLD"));
        let store = vault_store(vault, kv.clone());

        let err = store.set_api_key(Provider::OpenAi, "sk-NEW").await.unwrap_err();
        assert!(matches!(err, StorageError::Keychain(_)));
        assert_eq!(kv.get("insecure:career-compass-openai").await.unwrap(), None);
        assert_eq!(
            store.get_api_key(Provider::OpenAi).await.unwrap().as_deref(),
            Some("sk-OLD")
        );
    }

    #[tokio::test]
    async fn test_insecure_fallback_clears_old_keychain_entry() {
        let kv = Arc::new(MemoryStore::new());
        let vault = Arc::new(FakeVault::available().with_entry("career-compass-groq", "gsk-OLD"));
        let store = VaultCredentialStore::new(Arc::new(FlakyStoreVault { inner: vault.clone() }), kv);

        let protection = store.set_api_key(Provider::Groq, "gsk-NEW").await.unwrap();
        assert_eq!(protection, KeyProtection::Insecure);
        assert_eq!(
            store.get_api_key(Provider::Groq).await.unwrap().as_deref(),
            Some("gsk-NEW")
        );
        assert!(vault.entries.lock().unwrap().is_empty());
    }

    /// Keychain whose writes report it unavailable while reads and removals work.
    struct FlakyStoreVault {
        inner: Arc<FakeVault>,
    }

    impl SecretVault for FlakyStoreVault {
        fn store(&self, _account: &str, _secret: &str) -> Result<(), VaultError> {
            Err(VaultError::Unavailable("locked".into()))
        }

        fn load(&self, account: &str) -> Result<Option<String>, VaultError> {
            self.inner.load(account)
        }

        fn remove(&self, account: &str) -> Result<(), VaultError> {
            self.inner.remove(account)
        }
    }

    #[tokio::test]
    async fn test_failed_keychain_read_falls_back_to_plaintext_slot() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("insecure:career-compass-claude", Value::String("sk-ant".into()))
            .await
            .unwrap();
        let vault = Arc::new(FakeVault {
            fail_load: true,
            ..FakeVault::available()
        });
        let store = vault_store(vault, kv);
        assert_eq!(
            store.get_api_key(Provider::Claude).await.unwrap().as_deref(),
            Some("sk-ant")
        );
    }

    #[tokio::test]
    async fn test_plain_store_is_always_insecure() {
        let kv = Arc::new(MemoryStore::new());
        let store = PlainCredentialStore::new(kv.clone());

        assert_eq!(
            store.set_api_key(Provider::OpenAi, "sk").await.unwrap(),
            KeyProtection::Insecure
        );
        assert_eq!(
            kv.get("career-compass-key-openai").await.unwrap(),
            Some(Value::String("sk".into()))
        );
        store.delete_api_key(Provider::OpenAi).await.unwrap();
        assert_eq!(store.get_api_key(Provider::OpenAi).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_isolated_per_provider() {
        let store = PlainCredentialStore::new(Arc::new(MemoryStore::new()));
        store.set_api_key(Provider::OpenAi, "one").await.unwrap();
        store.set_api_key(Provider::Groq, "two").await.unwrap();
        store.delete_api_key(Provider::OpenAi).await.unwrap();
        assert_eq!(
            store.get_api_key(Provider::Groq).await.unwrap().as_deref(),
            Some("two")
        );
    }
}
