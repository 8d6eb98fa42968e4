use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::DocumentError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts the body text of an Office Open XML word-processing document.
///
/// Paragraphs and explicit line breaks become newlines, tabs become `\t`.
/// Legacy binary `.doc` files are not ZIP containers and fail here.
pub fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DocumentError::Extraction(format!("DOCX: not a valid document ({e})")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| DocumentError::Extraction(format!("DOCX: missing {DOCUMENT_PART} ({e})")))?
        .read_to_string(&mut xml)
        .map_err(|e| DocumentError::Extraction(format!("DOCX: {e}")))?;

    text_from_document_xml(&xml)
}

fn text_from_document_xml(xml: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:tab" => text.push('\t'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let chunk = t
                    .unescape()
                    .map_err(|e| DocumentError::Extraction(format!("DOCX: {e}")))?;
                text.push_str(&chunk);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Extraction(format!(
                    "DOCX: malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(text)
}
