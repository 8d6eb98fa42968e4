use tracing::warn;

use super::DocumentError;

/// Extracts text from an in-memory PDF.
///
/// `pdf-extract` is synchronous and can panic on malformed input, so it runs
/// on the blocking pool and a panicked task is reported as an extraction error.
pub async fn extract_text(bytes: Vec<u8>) -> Result<String, DocumentError> {
    let task = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes));

    match task.await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Extraction(format!("PDF: {e}"))),
        Err(e) => {
            warn!("PDF extraction task aborted: {e}");
            Err(DocumentError::Extraction(
                "PDF: document could not be read".to_string(),
            ))
        }
    }
}
