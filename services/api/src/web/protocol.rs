//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged over the HTTP API.
//!
//! Every struct here derives `ToSchema` so it shows up in the generated
//! OpenAPI document.

use chrono::{DateTime, Utc};
use flashcards_core::{Flashcard, FlashcardSetDetail, SavedFlashcard, SavedFlashcardSet};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Number of cards generated when the caller does not say.
pub const DEFAULT_CARD_COUNT: usize = 5;

fn default_card_count() -> usize {
    DEFAULT_CARD_COUNT
}

//=========================================================================================
// Flashcards
//=========================================================================================

/// A single question/answer pair as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FlashcardDto {
    pub question: String,
    pub answer: String,
}

impl From<Flashcard> for FlashcardDto {
    fn from(card: Flashcard) -> Self {
        Self {
            question: card.question,
            answer: card.answer,
        }
    }
}

impl From<FlashcardDto> for Flashcard {
    fn from(dto: FlashcardDto) -> Self {
        Self {
            question: dto.question,
            answer: dto.answer,
        }
    }
}

//=========================================================================================
// Upload & Generate
//=========================================================================================

/// Returned by `POST /upload`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// The names the files were stored under.
    pub uploaded: Vec<String>,
    /// Pass this to `/generate` to use the uploaded files. It can be used once.
    pub upload_id: Uuid,
}

/// Parameters of a generate request, accepted as a JSON body or a query string.
///
/// Exactly one of `file_url` and `upload_id` must be given.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateRequest {
    /// A document to download (pdf, txt or docx).
    #[serde(default)]
    pub file_url: Option<String>,
    /// The id returned by a previous `/upload`.
    #[serde(default)]
    pub upload_id: Option<Uuid>,
    /// How many cards to generate. Defaults to 5.
    #[serde(default = "default_card_count")]
    pub num_flash_cards: usize,
    #[serde(default)]
    pub optional_instructions: Option<String>,
    /// When present, the generated set is also saved for this user.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Title of the saved set; only used together with `user_id`.
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            file_url: None,
            upload_id: None,
            num_flash_cards: DEFAULT_CARD_COUNT,
            optional_instructions: None,
            user_id: None,
            title: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub flashcards: Vec<FlashcardDto>,
    /// Only present when the set was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<Uuid>,
}

//=========================================================================================
// Saved Sets
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveFlashcardsRequest {
    pub flashcards: Vec<FlashcardDto>,
    pub user_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveFlashcardsResponse {
    pub success: bool,
    pub set_id: Uuid,
    pub cards_count: usize,
}

/// A saved set without its cards.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlashcardSetSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub card_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<SavedFlashcardSet> for FlashcardSetSummary {
    fn from(set: SavedFlashcardSet) -> Self {
        Self {
            id: set.id,
            user_id: set.user_id,
            title: set.title,
            card_count: set.card_count,
            created_at: set.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavedFlashcardDto {
    pub id: Uuid,
    pub position: usize,
    pub question: String,
    pub answer: String,
}

impl From<SavedFlashcard> for SavedFlashcardDto {
    fn from(card: SavedFlashcard) -> Self {
        Self {
            id: card.id,
            position: card.position,
            question: card.question,
            answer: card.answer,
        }
    }
}

/// A saved set with its cards in order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlashcardSetResponse {
    #[serde(flatten)]
    pub set: FlashcardSetSummary,
    pub flashcards: Vec<SavedFlashcardDto>,
}

impl From<FlashcardSetDetail> for FlashcardSetResponse {
    fn from(detail: FlashcardSetDetail) -> Self {
        Self {
            set: detail.set.into(),
            flashcards: detail.cards.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
