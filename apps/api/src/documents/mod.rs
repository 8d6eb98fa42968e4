//! Document ingestion: turns an uploaded résumé into plain text.
//!
//! Dispatch is by filename extension (case-insensitive) over a closed set.
//! Unknown extensions are rejected before any bytes are inspected.
//! Processors return raw text; callers run `normalize::normalize` on it.

use thiserror::Error;
use tracing::debug;

pub mod docx;
pub mod handlers;
pub mod normalize;
pub mod pdf;

pub use normalize::normalize;

const SUPPORTED_FILE_TYPES: [&str; 4] = [".pdf", ".md", ".docx", ".doc"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to extract text: {0}")]
    Extraction(String),
}

/// The processor selected for a given upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileProcessor {
    /// Markdown and plain text: bytes are decoded as UTF-8 and passed through.
    Markdown,
    Pdf,
    /// `.docx` and legacy `.doc` both go through the Office Open XML reader.
    Docx,
}

impl FileProcessor {
    /// Selects a processor from the filename's extension.
    pub fn for_filename(filename: &str) -> Result<Self, DocumentError> {
        let extension = extension_of(filename);
        match extension.as_str() {
            ".pdf" => Ok(FileProcessor::Pdf),
            ".md" => Ok(FileProcessor::Markdown),
            ".docx" | ".doc" => Ok(FileProcessor::Docx),
            _ => Err(DocumentError::UnsupportedFileType(extension)),
        }
    }

    /// Extracts raw, un-normalized text from the file contents.
    pub async fn process_file(self, bytes: Vec<u8>) -> Result<String, DocumentError> {
        match self {
            FileProcessor::Markdown => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            FileProcessor::Pdf => pdf::extract_text(bytes).await,
            FileProcessor::Docx => docx::extract_text(&bytes),
        }
    }
}

/// Lower-cased extension including the leading dot, or an empty string.
fn extension_of(filename: &str) -> String {
    filename
        .rfind('.')
        .map(|idx| filename[idx..].to_lowercase())
        .unwrap_or_default()
}

pub fn supported_file_types() -> &'static [&'static str] {
    &SUPPORTED_FILE_TYPES
}

pub fn is_supported(filename: &str) -> bool {
    SUPPORTED_FILE_TYPES.contains(&extension_of(filename).as_str())
}

/// Full upload path: select processor, extract, normalize.
pub async fn extract_document(filename: &str, bytes: Vec<u8>) -> Result<String, DocumentError> {
    let processor = FileProcessor::for_filename(filename)?;
    debug!(
        "Extracting {} ({} bytes) with {:?} processor",
        filename,
        bytes.len(),
        processor
    );
    let raw = processor.process_file(bytes).await?;
    Ok(normalize(&raw))
}
