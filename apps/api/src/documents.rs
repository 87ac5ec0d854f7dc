//! Text extraction from uploaded documents (PDF, DOCX, TXT).

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("Invalid DOCX archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid DOCX markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Text file is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Resolves the kind from the file extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Result<Self, DocumentError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "txt" => Ok(DocumentKind::Text),
            "" => Err(DocumentError::Unsupported(file_name.to_string())),
            other => Err(DocumentError::Unsupported(format!(".{other}"))),
        }
    }
}

/// Extracts normalised plain text from a document. CPU-bound; call from a blocking task.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let kind = DocumentKind::from_file_name(file_name)?;
    let raw = match kind {
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::Docx => extract_docx(bytes)?,
        DocumentKind::Text => String::from_utf8(bytes.to_vec())?,
    };
    let text = normalize_whitespace(&raw);
    debug!(
        "Extracted {} chars from {} ({:?})",
        text.len(),
        file_name,
        kind
    );
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    // pdf-extract can panic on malformed input
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Pdf(e.to_string())),
        Err(_) => Err(DocumentError::Pdf("malformed PDF".to_string())),
    }
}

/// Reads `word/document.xml`, one line per `w:p` paragraph.
fn extract_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::with_capacity(xml.len() / 4);
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

/// Collapses runs of spaces and tabs, trims every line and keeps at most one blank line in a row.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(&collapsed);
        out.push('\n');
    }

    out.trim_end().to_string()
}
