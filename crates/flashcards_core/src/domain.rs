//! crates/flashcards_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Apart from the serde derives on `Flashcard`, these structs are independent of
//! any database or transport format.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The document formats the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Docx,
}

impl DocumentFormat {
    /// Infers the format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Infers the format from a MIME type, ignoring any parameters such as `charset`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" | "text/markdown" => Some(Self::Text),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
            Self::Docx => "docx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A document stored on disk for the lifetime of a single request.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub format: DocumentFormat,
    pub path: PathBuf,
}

/// A document as returned by the download port, before it is written to disk.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl RemoteDocument {
    /// The file name takes precedence over the content type, mirroring how uploads are typed.
    pub fn format(&self) -> Option<DocumentFormat> {
        self.file_name
            .as_deref()
            .and_then(DocumentFormat::from_file_name)
            .or_else(|| self.content_type.as_deref().and_then(DocumentFormat::from_mime))
    }
}

/// One window of extracted text.
///
/// `overlap` is the number of leading chars shared with the previous chunk; it is
/// zero for the first chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub overlap: usize,
}

/// Errors raised when a caller asks for an impossible number of flashcards.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("num_flash_cards must be greater than zero")]
    ZeroCount,
    #[error("num_flash_cards must not exceed {max}, got {requested}")]
    TooMany { requested: usize, max: usize },
}

/// What the caller asked for: how many cards, and any free-text guidance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardRequest {
    count: usize,
    instructions: Option<String>,
}

impl FlashcardRequest {
    pub fn new(count: usize, instructions: Option<String>) -> Result<Self, RequestError> {
        if count == 0 {
            return Err(RequestError::ZeroCount);
        }
        let instructions = instructions.filter(|text| !text.trim().is_empty());
        Ok(Self {
            count,
            instructions,
        })
    }

    /// Rejects requests above the configured ceiling.
    pub fn ensure_at_most(self, max: usize) -> Result<Self, RequestError> {
        if self.count > max {
            return Err(RequestError::TooMany {
                requested: self.count,
                max,
            });
        }
        Ok(self)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }
}

/// A single question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// A validated batch of flashcards and the attempt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardSet {
    pub cards: Vec<Flashcard>,
    pub attempts: u32,
}

/// The header row of a persisted flashcard set.
#[derive(Debug, Clone)]
pub struct SavedFlashcardSet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub card_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A persisted flashcard, ordered within its set by `position`.
#[derive(Debug, Clone)]
pub struct SavedFlashcard {
    pub id: Uuid,
    pub set_id: Uuid,
    pub position: usize,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct FlashcardSetDetail {
    pub set: SavedFlashcardSet,
    pub cards: Vec<SavedFlashcard>,
}
