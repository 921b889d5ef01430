//! services/api/src/web/generate_task.rs
//!
//! The flashcard pipeline behind `/generate`: fetch, extract, chunk, prompt,
//! generate, and optionally persist.

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::workspace::RequestWorkspace;
use chrono::Utc;
use flashcards_core::{
    build_prompt, generate_flashcards, render_context, Flashcard, FlashcardRequest, FlashcardSet,
    SavedFlashcardSet,
};
use tracing::{info, instrument};
use uuid::Uuid;

/// Downloads `url` and stores the document in `workspace`.
#[instrument(skip(state, workspace))]
pub async fn fetch_into(
    state: &AppState,
    workspace: &mut RequestWorkspace,
    url: &str,
) -> Result<(), ApiError> {
    let remote = state
        .downloader
        .download(url)
        .await
        .map_err(|e| ApiError::Download(e.to_string()))?;

    workspace
        .store(
            remote.file_name.as_deref(),
            remote.content_type.as_deref(),
            &remote.bytes,
        )
        .await?;
    Ok(())
}

/// Runs extraction, chunking, prompting and the generation loop over a workspace.
pub async fn generate_from_workspace(
    state: &AppState,
    workspace: &RequestWorkspace,
    request: &FlashcardRequest,
) -> Result<FlashcardSet, ApiError> {
    let documents = workspace.documents();
    if documents.is_empty() {
        return Err(ApiError::BadRequest(
            "No supported documents were provided (pdf, txt, docx)".to_string(),
        ));
    }

    let text = state.extractor.extract_all(documents).await?;
    let chunks = state.config.chunker.split(&text);
    let context = render_context(&chunks, state.config.max_context_chunks);
    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "Prepared document context"
    );

    let prompt = build_prompt(&context, request.count(), request.instructions());
    let set = generate_flashcards(
        state.generator.as_ref(),
        &prompt,
        request.count(),
        state.config.max_generation_attempts,
    )
    .await?;
    Ok(set)
}

/// Saves a set of cards for a user, falling back to a dated title.
pub async fn persist(
    state: &AppState,
    user_id: Uuid,
    title: Option<&str>,
    cards: &[Flashcard],
) -> Result<SavedFlashcardSet, ApiError> {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_title);

    let saved = state
        .db
        .save_flashcard_set(user_id, &title, cards)
        .await
        .map_err(ApiError::from_store)?;
    info!(set_id = %saved.id, %user_id, cards = saved.card_count, "Saved flashcard set");
    Ok(saved)
}

fn default_title() -> String {
    Utc::now().format("Flashcards %Y-%m-%d %H:%M").to_string()
}
