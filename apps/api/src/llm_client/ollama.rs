//! Local model discovery against an Ollama server.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{join_url, status, Provider};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: String,
    pub modified: String,
}

/// Result of a model listing. A failed listing is an empty list plus `error`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelListing {
    pub models: Vec<ModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_at: String,
}

impl From<TagEntry> for ModelInfo {
    fn from(entry: TagEntry) -> Self {
        let modified = DateTime::parse_from_rfc3339(&entry.modified_at)
            .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
            .unwrap_or(entry.modified_at);
        Self {
            name: entry.name,
            size: format_size(entry.size),
            modified,
        }
    }
}

/// Server root for the native API: the OpenAI-compatible base with any
/// trailing `/v1` removed.
pub fn server_root(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let trimmed = if trimmed.is_empty() {
        Provider::Ollama.default_base_url()
    } else {
        trimmed
    };
    trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string()
}

pub(super) async fn list_models(client: &Client, base_url: &str) -> ModelListing {
    let root = server_root(base_url);
    if let Err(message) = status::validate_base_url(&root) {
        return ModelListing::failed(message);
    }

    let response = match client.get(join_url(&root, "api/tags")).send().await {
        Ok(r) => r,
        Err(e) => {
            let message = status::classify_transport(Provider::Ollama, &root, &e);
            warn!("Failed to list local models: {message}");
            return ModelListing::failed(message);
        }
    };

    let code = response.status();
    if !code.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = status::classify_status(Provider::Ollama, code.as_u16(), &body);
        warn!("Failed to list local models: {message}");
        return ModelListing::failed(message);
    }

    match response.json::<TagsResponse>().await {
        Ok(tags) => {
            debug!("Found {} local models at {}", tags.models.len(), root);
            ModelListing {
                models: tags.models.into_iter().map(ModelInfo::from).collect(),
                error: None,
            }
        }
        Err(e) => {
            warn!("Unreadable model list from {}: {}", root, e);
            ModelListing::failed(format!("Unexpected response from Ollama: {e}"))
        }
    }
}

impl ModelListing {
    fn failed(message: String) -> Self {
        Self {
            models: Vec::new(),
            error: Some(message),
        }
    }
}

/// Decimal units, one fractional digit: `4661224676` → `"4.7 GB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    // Compare the rounded value so 999_999 becomes "1.0 MB", not "1000.0 KB".
    while (value * 10.0).round() >= 10_000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_server_root_strips_v1() {
        assert_eq!(server_root("http://localhost:11434/v1"), "http://localhost:11434");
        assert_eq!(server_root("http://localhost:11434/v1/"), "http://localhost:11434");
        assert_eq!(server_root("http://gpu-box:11434"), "http://gpu-box:11434");
        assert_eq!(server_root(""), "http://localhost:11434");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1_500), "1.5 KB");
        assert_eq!(format_size(4_661_224_676), "4.7 GB");
        assert_eq!(format_size(2_000_000_000_000), "2.0 TB");
    }

    #[test]
    fn test_format_size_rounds_into_next_unit() {
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(999_949), "999.9 KB");
        assert_eq!(format_size(999_999), "1.0 MB");
        assert_eq!(format_size(999_999_999), "1.0 GB");
    }

    #[tokio::test]
    async fn test_list_models_parses_tags() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(
                r#"{"models":[{"name":"llama3.1:8b","model":"llama3.1:8b","modified_at":"2024-07-25T12:00:00-07:00","size":4661224676,"digest":"abc"}]}"#,
            )
            .create_async()
            .await;

        let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();
        let listing = list_models(&client, &format!("{}/v1", server.url())).await;

        assert!(listing.error.is_none());
        assert_eq!(
            listing.models,
            vec![ModelInfo {
                name: "llama3.1:8b".into(),
                size: "4.7 GB".into(),
                modified: "2024-07-25T19:00:00+00:00".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_list_models_failure_is_empty_with_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(500)
            .create_async()
            .await;

        let client = Client::new();
        let listing = list_models(&client, &server.url()).await;

        assert!(listing.models.is_empty());
        assert!(listing.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_list_models_bad_url() {
        let listing = list_models(&Client::new(), "::nope::").await;
        assert!(listing.models.is_empty());
        assert!(listing.error.is_some());
    }
}
