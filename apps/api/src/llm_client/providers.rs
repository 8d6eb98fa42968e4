//! Provider catalogue: the single table of per-provider constants.
//!
//! Endpoints, default models, auth scheme and the API-key environment
//! variable all live here. Nothing else in the crate hard-codes them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Chat-completion back ends. Serialized names match the persisted settings
/// record (`"ollama"`, `"openai"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAi,
    Claude,
    Groq,
    Gemini,
}

/// Request/response body shape spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAiChat,
    AnthropicMessages,
}

/// How the API key travels to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    Bearer,
    AnthropicKey,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Ollama,
        Provider::OpenAi,
        Provider::Claude,
        Provider::Groq,
        Provider::Gemini,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Groq => "groq",
            Provider::Gemini => "gemini",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Ollama => "Ollama (Local)",
            Provider::OpenAi => "OpenAI",
            Provider::Claude => "Anthropic Claude",
            Provider::Groq => "Groq",
            Provider::Gemini => "Google Gemini",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Provider::Ollama => "Run models locally on your machine",
            Provider::OpenAi => "GPT models from OpenAI",
            Provider::Claude => "Claude models from Anthropic",
            Provider::Groq => "Fast inference with Groq",
            Provider::Gemini => "Gemini models from Google",
        }
    }

    pub fn website(self) -> &'static str {
        match self {
            Provider::Ollama => "https://ollama.ai",
            Provider::OpenAi => "https://openai.com",
            Provider::Claude => "https://claude.ai",
            Provider::Groq => "https://groq.com",
            Provider::Gemini => "https://ai.google.dev",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Claude => "https://api.anthropic.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai/",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Ollama => "llama3.1:8b",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Claude => "claude-3-haiku-20240307",
            Provider::Groq => "llama-3.1-70b-versatile",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }

    /// Environment variable consulted when no key is stored.
    /// The local provider never needs a key and has none.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Provider::Ollama => None,
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Claude => Some("ANTHROPIC_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::Gemini => Some("GOOGLE_API_KEY"),
        }
    }

    pub fn requires_api_key(self) -> bool {
        self.api_key_env().is_some()
    }

    pub fn wire_format(self) -> WireFormat {
        match self {
            Provider::Claude => WireFormat::AnthropicMessages,
            Provider::Ollama | Provider::OpenAi | Provider::Groq | Provider::Gemini => {
                WireFormat::OpenAiChat
            }
        }
    }

    pub fn auth_scheme(self) -> AuthScheme {
        match self {
            Provider::Ollama => AuthScheme::None,
            Provider::Claude => AuthScheme::AnthropicKey,
            Provider::OpenAi | Provider::Groq | Provider::Gemini => AuthScheme::Bearer,
        }
    }

    /// Remediation hint shown when no key could be resolved.
    pub fn missing_key_hint(self) -> String {
        match self.api_key_env() {
            Some(var) => format!(
                "add a {} API key in Settings or set the {var} environment variable",
                self.display_name()
            ),
            None => String::new(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider '{s}'"))
    }
}

/// Static description of a provider plus its current key status, as shown on
/// the settings page.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: Provider,
    pub name: &'static str,
    pub description: &'static str,
    pub website: &'static str,
    pub requires_api_key: bool,
    pub default_base_url: &'static str,
    pub default_model: &'static str,
    pub api_key_env: Option<&'static str>,
    pub has_stored_key: bool,
    pub env_key_present: bool,
}

impl ProviderInfo {
    pub fn new(provider: Provider, has_stored_key: bool, env_key_present: bool) -> Self {
        Self {
            id: provider,
            name: provider.display_name(),
            description: provider.description(),
            website: provider.website(),
            requires_api_key: provider.requires_api_key(),
            default_base_url: provider.default_base_url(),
            default_model: provider.default_model(),
            api_key_env: provider.api_key_env(),
            has_stored_key,
            env_key_present,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_names_match_persisted_format() {
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
        let p: Provider = serde_json::from_str("\"claude\"").unwrap();
        assert_eq!(p, Provider::Claude);
        for p in Provider::ALL {
            assert_eq!(serde_json::to_value(p).unwrap(), p.as_str());
        }
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!(" groq ".parse::<Provider>().unwrap(), Provider::Groq);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn test_only_local_provider_is_keyless() {
        for p in Provider::ALL {
            assert_eq!(p.requires_api_key(), p != Provider::Ollama, "{p}");
        }
        assert_eq!(Provider::Ollama.auth_scheme(), AuthScheme::None);
    }

    #[test]
    fn test_env_var_names_are_distinct() {
        let mut names: Vec<_> = Provider::ALL.iter().filter_map(|p| p.api_key_env()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_missing_key_hint_names_env_var() {
        assert!(Provider::Groq.missing_key_hint().contains("GROQ_API_KEY"));
        assert!(Provider::Ollama.missing_key_hint().is_empty());
    }
}
