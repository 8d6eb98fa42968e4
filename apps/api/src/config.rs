use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Where settings and API keys are persisted. Chosen once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// JSON settings file, API keys in the OS keychain.
    Desktop,
    /// JSON settings file, API keys in plaintext alongside it.
    Web,
    /// Nothing leaves the process.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(StorageBackend::Desktop),
            "web" => Ok(StorageBackend::Web),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("unknown storage backend '{other}' (expected desktop, web or memory)"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Everything has a default; only malformed values are errors.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub keychain_service: String,
    pub llm_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            storage_backend: std::env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "desktop".to_string())
                .parse()
                .context("STORAGE_BACKEND is invalid")?,
            data_dir: std::env::var("CAREER_COMPASS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            keychain_service: std::env::var("KEYCHAIN_SERVICE")
                .unwrap_or_else(|_| "career-compass".to_string()),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("career-compass"))
        .unwrap_or_else(|| PathBuf::from(".career-compass"))
}

/// Read access to environment variables, injectable for tests.
pub trait Environment: Send + Sync {
    /// Returns the variable's value, treating unset and blank alike.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }
}
