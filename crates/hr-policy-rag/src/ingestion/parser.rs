//! Page-aware text extraction for PDF and plain-text sources

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Text of one page
#[derive(Debug, Clone)]
pub struct PageText {
    /// Page number (1-indexed); absent for unpaginated sources
    pub page: Option<u32>,
    /// Raw extracted text
    pub text: String,
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name used as the passage source identifier
    pub source_id: String,
    /// Pages in order
    pub pages: Vec<PageText>,
}

/// File types the indexing job accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    /// Detect from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Upper bound on a whole-document pdf-extract pass
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Extracts text from source files
pub struct DocumentParser;

impl DocumentParser {
    /// Read and parse a file from disk
    pub fn parse_file(path: &Path) -> Result<SourceDocument> {
        let source_id = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let kind = SourceKind::from_path(path).ok_or_else(|| {
            Error::file_parse(&source_id, "Unsupported file type (expected .pdf, .txt or .md)")
        })?;

        let data = std::fs::read(path)?;
        Self::parse_bytes(&source_id, kind, &data)
    }

    /// Parse in-memory file contents
    pub fn parse_bytes(source_id: &str, kind: SourceKind, data: &[u8]) -> Result<SourceDocument> {
        let pages = match kind {
            SourceKind::Pdf => Self::parse_pdf(source_id, data)?,
            SourceKind::Text => vec![PageText {
                page: None,
                text: String::from_utf8_lossy(data).into_owned(),
            }],
        };

        if pages.iter().all(|p| p.text.trim().is_empty()) {
            return Err(Error::file_parse(source_id, "No text content could be extracted"));
        }

        Ok(SourceDocument {
            source_id: source_id.to_string(),
            pages,
        })
    }

    /// Per-page extraction with lopdf, falling back to pdf-extract for the
    /// whole document when page extraction yields nothing
    fn parse_pdf(source_id: &str, data: &[u8]) -> Result<Vec<PageText>> {
        match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let mut pages = Vec::new();
                for page_number in doc.get_pages().keys() {
                    match doc.extract_text(&[*page_number]) {
                        Ok(text) => pages.push(PageText {
                            page: Some(*page_number),
                            text,
                        }),
                        Err(e) => {
                            tracing::debug!("Could not extract page {} of {}: {}", page_number, source_id, e);
                        }
                    }
                }

                if pages.iter().any(|p| !p.text.trim().is_empty()) {
                    return Ok(pages);
                }
                tracing::warn!("lopdf found no text in {}, trying pdf-extract", source_id);
            }
            Err(e) => {
                tracing::warn!("lopdf failed to load {}: {}, trying pdf-extract", source_id, e);
            }
        }

        let data = data.to_vec();
        let text = run_isolated(source_id, PDF_EXTRACT_TIMEOUT, move || {
            pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
        })?;

        Ok(vec![PageText { page: None, text }])
    }
}

/// Run an extractor on its own thread so a panic or a hang inside it
/// becomes a parse error for this file only.
///
/// A timed-out thread cannot be killed; it is detached and left to finish.
fn run_isolated<T, F>(source_id: &str, timeout: Duration, extract: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, String> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(extract)));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(Ok(text))) => {
            let _ = handle.join();
            Ok(text)
        }
        Ok(Ok(Err(e))) => {
            let _ = handle.join();
            Err(Error::file_parse(source_id, format!("PDF extraction failed: {}", e)))
        }
        Ok(Err(_)) | Err(mpsc::RecvTimeoutError::Disconnected) => {
            tracing::error!("PDF extraction crashed on {}", source_id);
            Err(Error::file_parse(source_id, "PDF extraction crashed"))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::error!(
                "PDF extraction of {} timed out after {}s",
                source_id,
                timeout.as_secs_f32()
            );
            Err(Error::file_parse(
                source_id,
                format!("PDF extraction timed out after {}s", timeout.as_secs_f32()),
            ))
        }
    }
}
