//! Connection-test results and the human-readable classification of failures.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::Provider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Accepts only absolute http(s) URLs with a host.
pub fn validate_base_url(base_url: &str) -> Result<(), String> {
    let url = Url::parse(base_url).map_err(|e| format!("Invalid base URL '{base_url}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(format!(
            "Invalid base URL '{base_url}': expected an http:// or https:// address"
        ));
    }
    Ok(())
}

pub fn classify_status(provider: Provider, status: u16, body: &str) -> String {
    let summary = match status {
        400 => "Request rejected".to_string(),
        401 => "Invalid API key".to_string(),
        403 => "Access denied for this API key".to_string(),
        404 => "Endpoint or model not found, check the base URL".to_string(),
        429 => "Rate limited or quota exceeded".to_string(),
        500..=599 => format!("{} is unavailable", provider.display_name()),
        _ => "Unexpected response".to_string(),
    };

    match error_detail(body) {
        Some(detail) => format!("{summary} (status {status}): {detail}"),
        None => format!("{summary} (status {status})"),
    }
}

pub fn classify_transport(provider: Provider, base_url: &str, error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Connection to {} timed out", provider.display_name())
    } else if error.is_connect() {
        match provider {
            Provider::Ollama => format!(
                "Could not connect to Ollama at {base_url}. Make sure Ollama is running"
            ),
            _ => format!(
                "Could not connect to {} at {base_url}",
                provider.display_name()
            ),
        }
    } else if error.is_builder() {
        format!("Invalid base URL '{base_url}': {error}")
    } else {
        format!("Request to {} failed: {error}", provider.display_name())
    }
}

/// Pulls `error.message` out of an OpenAI-, Anthropic- or Gemini-style error
/// body. Falls back to a short raw excerpt.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let value = value.as_array().and_then(|a| a.first()).unwrap_or(&value);
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error").filter(|e| e.is_string()))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return Some(message.to_string());
        }
    }

    const MAX_EXCERPT: usize = 200;
    let excerpt: String = body.chars().take(MAX_EXCERPT).collect();
    Some(excerpt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("http://localhost:11434/v1").is_ok());
        assert!(validate_base_url("https://api.openai.com/v1").is_ok());
        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("http://").is_err());
        assert!(validate_base_url("localhost:11434").is_err());
        assert!(validate_base_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_classify_openai_error_body() {
        let msg = classify_status(
            Provider::OpenAi,
            401,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        );
        assert_eq!(msg, "Invalid API key (status 401): Incorrect API key provided");
    }

    #[test]
    fn test_classify_gemini_array_body() {
        let msg = classify_status(
            Provider::Gemini,
            400,
            r#"[{"error":{"code":400,"message":"API key not valid"}}]"#,
        );
        assert!(msg.ends_with("API key not valid"));
    }

    #[test]
    fn test_classify_ollama_string_error() {
        let msg = classify_status(Provider::Ollama, 404, r#"{"error":"model 'x' not found"}"#);
        assert!(msg.starts_with("Endpoint or model not found"));
        assert!(msg.contains("model 'x' not found"));
    }

    #[test]
    fn test_classify_server_error_names_provider() {
        let msg = classify_status(Provider::Groq, 503, "");
        assert_eq!(msg, "Groq is unavailable (status 503)");
    }

    #[test]
    fn test_raw_body_is_truncated() {
        let body = "x".repeat(1000);
        let msg = classify_status(Provider::OpenAi, 418, &body);
        assert!(msg.len() < 300);
    }
}
