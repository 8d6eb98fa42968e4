//! Axum route handlers for completions and career analysis.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::analysis::analyze_resume;
use crate::errors::AppError;
use crate::llm_client::ChatMessage;
use crate::settings::ConfigOverrides;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume_text: String,
    #[serde(default)]
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// POST /api/v1/completions
pub async fn handle_completion(
    State(state): State<AppState>,
    Json(request): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    if request.messages.is_empty() {
        return Err(AppError::Validation("messages cannot be empty".to_string()));
    }

    let config = state.resolver.resolve(&request.overrides).await;
    let content = state.llm.create_completion(&request.messages, &config).await?;
    Ok(Json(CompletionResponse { content }))
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let analysis = analyze_resume(
        &request.resume_text,
        &request.overrides,
        &state.resolver,
        &state.llm,
    )
    .await?;
    Ok(Json(AnalyzeResponse { analysis }))
}
