//! Axum route handlers for settings, providers and local models.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{status, ConnectionStatus, ModelListing, Provider, ProviderInfo};
use crate::settings::{ConfigOverrides, KeyProtection, KeySource, SettingsConfig};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    #[serde(flatten)]
    pub settings: SettingsConfig,
    pub requires_api_key: bool,
    pub key_source: KeySource,
}

#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    pub provider: Provider,
    #[serde(default, rename = "baseURL", alias = "base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    /// Non-empty replaces the stored key, empty deletes it.
    #[serde(default, rename = "apiKey", alias = "api_key")]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SaveSettingsResponse {
    pub settings: SettingsConfig,
    /// Absent when no key was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_protection: Option<KeyProtection>,
}

#[derive(Debug, Serialize)]
pub struct ProviderStatusEntry {
    pub provider: Provider,
    #[serde(flatten)]
    pub status: ConnectionStatus,
}

#[derive(Debug, Deserialize)]
pub struct LocalModelsQuery {
    #[serde(default, rename = "baseURL", alias = "base_url")]
    pub base_url: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let settings = state.settings.get().await;
    let (_, key_source) = state.resolver.api_key_with_source(settings.provider).await;
    Json(SettingsResponse {
        requires_api_key: settings.provider.requires_api_key(),
        settings,
        key_source,
    })
}

/// PUT /api/v1/settings
///
/// Blank `baseURL`/`model` fall back to the provider's defaults. A hosted
/// provider must end up with a key, either from this request or from the
/// environment.
pub async fn handle_save_settings(
    State(state): State<AppState>,
    Json(request): Json<SaveSettingsRequest>,
) -> Result<Json<SaveSettingsResponse>, AppError> {
    let provider = request.provider;
    let api_key = request.api_key.trim();

    if provider.requires_api_key() && api_key.is_empty() && !state.resolver.has_env_fallback(provider)
    {
        return Err(AppError::Validation(format!(
            "API key is required for {}. {}",
            provider.display_name(),
            provider.missing_key_hint()
        )));
    }

    let mut settings = SettingsConfig::for_provider(provider);
    if !request.base_url.trim().is_empty() {
        status::validate_base_url(request.base_url.trim()).map_err(AppError::Validation)?;
        settings.base_url = request.base_url.trim().to_string();
    }
    if !request.model.trim().is_empty() {
        settings.model = request.model.trim().to_string();
    }

    // Key first: a failed key write leaves the saved provider untouched.
    let key_protection = if !provider.requires_api_key() {
        None
    } else if api_key.is_empty() {
        state.secrets.delete_api_key(provider).await?;
        None
    } else {
        Some(state.secrets.set_api_key(provider, api_key).await?)
    };

    state.settings.set(&settings).await?;

    info!(
        "Saved settings for {} (model: {}, key: {:?})",
        provider, settings.model, key_protection
    );

    Ok(Json(SaveSettingsResponse {
        settings,
        key_protection,
    }))
}

/// DELETE /api/v1/settings
///
/// Clears the settings record and every provider's stored key.
pub async fn handle_reset_settings(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.settings.clear().await?;
    for provider in Provider::ALL {
        state.secrets.delete_api_key(provider).await?;
    }
    info!("Settings reset to defaults");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/providers
pub async fn handle_list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    let infos = Provider::ALL.into_iter().map(|provider| {
        let state = state.clone();
        async move {
            let (_, source) = state.resolver.api_key_with_source(provider).await;
            ProviderInfo::new(
                provider,
                source == KeySource::Stored,
                state.resolver.env_key_present(provider),
            )
        }
    });
    Json(join_all(infos).await)
}

/// POST /api/v1/providers/:provider/test
///
/// Body is optional; when present its fields override the persisted
/// configuration for this one test. Its `provider` field is ignored.
/// A non-empty body that is not a valid override object is rejected.
pub async fn handle_test_provider(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    body: Bytes,
) -> Result<Json<ConnectionStatus>, AppError> {
    let provider: Provider = provider.parse().map_err(AppError::NotFound)?;
    let overrides: ConfigOverrides = if body.iter().all(u8::is_ascii_whitespace) {
        ConfigOverrides::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?
    };

    let config = state.resolver.resolve_for(provider, &overrides).await;
    Ok(Json(state.llm.test_connection(&config).await))
}

/// GET /api/v1/providers/status
///
/// Tests every provider concurrently with its persisted configuration.
pub async fn handle_provider_status(
    State(state): State<AppState>,
) -> Json<Vec<ProviderStatusEntry>> {
    let checks = Provider::ALL.into_iter().map(|provider| {
        let state = state.clone();
        async move {
            let config = state
                .resolver
                .resolve_for(provider, &ConfigOverrides::default())
                .await;
            ProviderStatusEntry {
                provider,
                status: state.llm.test_connection(&config).await,
            }
        }
    });
    Json(join_all(checks).await)
}

/// GET /api/v1/models/local?baseURL=
///
/// Without `baseURL` the local provider's resolved endpoint is used.
pub async fn handle_local_models(
    State(state): State<AppState>,
    Query(query): Query<LocalModelsQuery>,
) -> Json<ModelListing> {
    let base_url = match query.base_url.filter(|b| !b.trim().is_empty()) {
        Some(base_url) => base_url,
        None => {
            state
                .resolver
                .resolve_for(Provider::Ollama, &ConfigOverrides::default())
                .await
                .base_url
        }
    };
    Json(state.llm.list_models(&base_url).await)
}
