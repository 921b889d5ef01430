//! crates/flashcards_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! generation pipeline independent of the LLM vendor, the database and the network.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Flashcard, FlashcardSetDetail, RemoteDocument, SavedFlashcardSet};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Stores one set row and one row per card, in order, as a single unit.
    async fn save_flashcard_set(
        &self,
        user_id: Uuid,
        title: &str,
        cards: &[Flashcard],
    ) -> PortResult<SavedFlashcardSet>;

    /// Lists a user's sets, newest first.
    async fn list_flashcard_sets(&self, user_id: Uuid) -> PortResult<Vec<SavedFlashcardSet>>;

    async fn get_flashcard_set(&self, set_id: Uuid) -> PortResult<FlashcardSetDetail>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends a prompt to the language model and returns its raw text reply.
    ///
    /// Errors mean the service itself failed (transport, auth, quota); a reply with
    /// bad content is still `Ok`.
    async fn generate_text(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait DocumentDownloadService: Send + Sync {
    /// Fetches a document from a remote URL.
    async fn download(&self, url: &str) -> PortResult<RemoteDocument>;
}
