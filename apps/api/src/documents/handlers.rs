//! Axum route handlers for résumé upload and parsing.

use axum::{extract::Multipart, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::documents::{extract_document, supported_file_types, FileProcessor};
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseFileRequest {
    /// Raw file bytes as a JSON array of numbers.
    pub file_data: Vec<u8>,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ParsedFileResponse {
    pub filename: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct FileTypesResponse {
    pub supported: &'static [&'static str],
}

/// POST /api/v1/files/parse
pub async fn handle_parse_file(
    Json(request): Json<ParseFileRequest>,
) -> Result<Json<ParsedFileResponse>, AppError> {
    let text = extract_document(&request.filename, request.file_data).await?;
    info!("Parsed {} ({} chars)", request.filename, text.len());
    Ok(Json(ParsedFileResponse {
        filename: request.filename,
        text,
    }))
}

/// POST /api/v1/files/upload
///
/// Multipart form with a single `file` field. Other fields are ignored.
pub async fn handle_upload_file(
    mut multipart: Multipart,
) -> Result<Json<ParsedFileResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field has no filename".to_string()))?;

        // Reject by extension before reading the body.
        FileProcessor::for_filename(&filename)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

        let text = extract_document(&filename, bytes.to_vec()).await?;
        info!("Parsed upload {} ({} chars)", filename, text.len());
        return Ok(Json(ParsedFileResponse { filename, text }));
    }

    Err(AppError::Validation("multipart field 'file' is required".to_string()))
}

/// GET /api/v1/files/types
pub async fn handle_file_types() -> Json<FileTypesResponse> {
    Json(FileTypesResponse {
        supported: supported_file_types(),
    })
}
