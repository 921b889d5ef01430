//! services/api/src/adapters/extractor.rs
//!
//! Turns stored documents into plain text. PDF and DOCX parsing is CPU-bound and
//! runs on the blocking thread pool.

use flashcards_core::{Document, DocumentFormat};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} document {file}: {reason}")]
    Unreadable {
        file: String,
        format: DocumentFormat,
        reason: String,
    },
    #[error("no text could be extracted from {0}")]
    Empty(String),
    #[error("none of the uploaded files is a supported document (pdf, txt, docx)")]
    NoSupportedDocuments,
}

/// Extracts text from PDF, plain-text and DOCX documents.
#[derive(Clone, Debug, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the full text of one document.
    pub async fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let text = match document.format {
            DocumentFormat::Text => read_text(document).await?,
            DocumentFormat::Pdf => {
                run_blocking(document, |path| read_pdf_pages(path).map(join_pdf_pages)).await?
            }
            DocumentFormat::Docx => run_blocking(document, read_docx).await?,
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty(document.file_name.clone()));
        }
        info!(
            file = %document.file_name,
            format = %document.format,
            chars = text.chars().count(),
            "Extracted document text"
        );
        Ok(text)
    }

    /// Extracts every document and joins the results with a blank line.
    ///
    /// A document that fails is logged and skipped; the call only fails when no
    /// document produced any text.
    pub async fn extract_all(&self, documents: &[Document]) -> Result<String, ExtractionError> {
        let mut texts = Vec::with_capacity(documents.len());
        let mut last_error = None;

        for document in documents {
            match self.extract(document).await {
                Ok(text) => texts.push(text),
                Err(e) => {
                    warn!(file = %document.file_name, error = %e, "Skipping document");
                    last_error = Some(e);
                }
            }
        }

        if texts.is_empty() {
            return Err(last_error.unwrap_or(ExtractionError::NoSupportedDocuments));
        }
        Ok(texts.join("\n\n"))
    }
}

async fn read_text(document: &Document) -> Result<String, ExtractionError> {
    let bytes = tokio::fs::read(&document.path)
        .await
        .map_err(|source| ExtractionError::Read {
            file: document.file_name.clone(),
            source,
        })?;
    String::from_utf8(bytes).map_err(|e| ExtractionError::Unreadable {
        file: document.file_name.clone(),
        format: DocumentFormat::Text,
        reason: e.to_string(),
    })
}

/// Runs a parser on the blocking pool, turning its error string (or a panic) into
/// an `Unreadable` error for the document.
async fn run_blocking<F>(document: &Document, parse: F) -> Result<String, ExtractionError>
where
    F: FnOnce(&Path) -> Result<String, String> + Send + 'static,
{
    let path: PathBuf = document.path.clone();
    let unreadable = |reason: String| ExtractionError::Unreadable {
        file: document.file_name.clone(),
        format: document.format,
        reason,
    };
    tokio::task::spawn_blocking(move || parse(&path))
        .await
        .map_err(|e| unreadable(format!("parser crashed: {e}")))?
        .map_err(unreadable)
}

fn read_pdf_pages(path: &Path) -> Result<Vec<String>, String> {
    pdf_extract::extract_text_by_pages(path).map_err(|e| e.to_string())
}

/// Joins pages in order with a line break, dropping embedded null characters.
fn join_pdf_pages(pages: Vec<String>) -> String {
    pages
        .iter()
        .map(|page| page.replace('\0', ""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_docx(path: &Path) -> Result<String, String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| format!("not a DOCX archive: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| format!("missing {DOCX_BODY}: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;
    docx_xml_to_text(&xml)
}

/// Walks WordprocessingML and keeps the text runs, one line per paragraph.
fn docx_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_run_text => {
                let run = e.unescape().map_err(|e| e.to_string())?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed XML at position {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }
    Ok(text)
}
