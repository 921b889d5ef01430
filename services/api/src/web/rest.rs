//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::generate_task::{fetch_into, generate_from_workspace, persist};
use crate::web::protocol::{
    FlashcardDto, FlashcardSetResponse, FlashcardSetSummary, GenerateRequest, GenerateResponse,
    HealthResponse, SaveFlashcardsRequest, SaveFlashcardsResponse, SavedFlashcardDto,
    UploadResponse,
};
use crate::web::state::AppState;
use crate::web::workspace::RequestWorkspace;
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, Multipart, Path, Query, Request, State,
    },
    http::header::CONTENT_TYPE,
    response::Json,
};
use flashcards_core::{Flashcard, FlashcardRequest};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_handler,
        generate_handler,
        generate_query_handler,
        save_flashcards_handler,
        list_flashcard_sets_handler,
        get_flashcard_set_handler,
        health_handler,
    ),
    components(
        schemas(
            FlashcardDto,
            UploadResponse,
            GenerateRequest,
            GenerateResponse,
            SaveFlashcardsRequest,
            SaveFlashcardsResponse,
            FlashcardSetSummary,
            FlashcardSetResponse,
            SavedFlashcardDto,
            HealthResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "Flashcards API", description = "Generate study flashcards from documents and keep them per user.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Extractors
//=========================================================================================

/// The body of `POST /generate`: JSON parameters, or a multipart form carrying the
/// documents themselves.
pub enum GenerateInput {
    Json(GenerateRequest),
    Multipart(Multipart),
}

impl<S> FromRequest<S> for GenerateInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e: MultipartRejection| ApiError::BadRequest(e.body_text()))?;
            Ok(Self::Multipart(multipart))
        } else {
            let Json(params) = Json::<GenerateRequest>::from_request(req, state)
                .await
                .map_err(|e: JsonRejection| ApiError::Validation(e.body_text()))?;
            Ok(Self::Json(params))
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Upload one or more documents for a later `/generate` call.
///
/// Every part with a file name is stored. The returned `upload_id` can be used once.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "One or more files (pdf, txt, docx)."),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files or unreadable form data", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut workspace = state.new_workspace()?;
    read_multipart(&mut workspace, multipart, |name, _| {
        debug!(field = name, "Ignoring form field on upload");
        Ok(())
    })
    .await?;

    if workspace.file_names().is_empty() {
        return Err(ApiError::BadRequest("No files were uploaded".to_string()));
    }

    let uploaded = workspace.file_names().to_vec();
    let upload_id = state.uploads.insert(workspace).await;
    info!(%upload_id, files = uploaded.len(), "Stored uploaded files");
    Ok(Json(UploadResponse {
        uploaded,
        upload_id,
    }))
}

/// Generate flashcards from a remote document, a previous upload, or files sent inline.
///
/// Accepts either a JSON body or a multipart form with file parts and the text fields
/// `num_flash_cards`, `optional_instructions`, `user_id`, `title` and `file_url`.
#[utoipa::path(
    post,
    path = "/generate",
    request_body(content = GenerateRequest, description = "Generation parameters. A multipart form with the same fields plus file parts is also accepted."),
    responses(
        (status = 200, description = "Flashcards generated", body = GenerateResponse),
        (status = 400, description = "No usable document or the download failed", body = ErrorBody),
        (status = 422, description = "Invalid parameters", body = ErrorBody),
        (status = 502, description = "Extraction, generation or storage failed", body = ErrorBody)
    )
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    input: GenerateInput,
) -> Result<Json<GenerateResponse>, ApiError> {
    match input {
        GenerateInput::Json(params) => generate_from_params(&state, params).await,
        GenerateInput::Multipart(multipart) => {
            let mut params = GenerateRequest::default();
            let mut workspace = state.new_workspace()?;
            read_multipart(&mut workspace, multipart, |name, value| {
                apply_form_field(&mut params, name, value)
            })
            .await?;

            let request = flashcard_request(&state, &params)?;
            if let Some(url) = params.file_url.as_deref() {
                fetch_into(&state, &mut workspace, url).await?;
            }
            respond(&state, workspace, request, params.user_id, params.title.as_deref()).await
        }
    }
}

/// Generate flashcards with the parameters given as a query string.
#[utoipa::path(
    get,
    path = "/generate",
    params(GenerateRequest),
    responses(
        (status = 200, description = "Flashcards generated", body = GenerateResponse),
        (status = 400, description = "No usable document or the download failed", body = ErrorBody),
        (status = 422, description = "Invalid parameters", body = ErrorBody),
        (status = 502, description = "Extraction, generation or storage failed", body = ErrorBody)
    )
)]
pub async fn generate_query_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<GenerateRequest>, QueryRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    generate_from_params(&state, params).await
}

/// Save a list of flashcards as a new set for a user.
#[utoipa::path(
    post,
    path = "/save-flashcards",
    request_body = SaveFlashcardsRequest,
    responses(
        (status = 200, description = "Set saved", body = SaveFlashcardsResponse),
        (status = 422, description = "Invalid payload", body = ErrorBody),
        (status = 502, description = "Storage failed", body = ErrorBody)
    )
)]
pub async fn save_flashcards_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveFlashcardsRequest>, JsonRejection>,
) -> Result<Json<SaveFlashcardsResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if payload.flashcards.is_empty() {
        return Err(ApiError::Validation("flashcards must not be empty".to_string()));
    }
    if let Some(index) = payload
        .flashcards
        .iter()
        .position(|card| card.question.trim().is_empty() || card.answer.trim().is_empty())
    {
        return Err(ApiError::Validation(format!(
            "flashcard {index} must have a non-empty question and answer"
        )));
    }

    let cards: Vec<Flashcard> = payload.flashcards.into_iter().map(Into::into).collect();
    let saved = persist(&state, payload.user_id, payload.title.as_deref(), &cards).await?;
    Ok(Json(SaveFlashcardsResponse {
        success: true,
        set_id: saved.id,
        cards_count: saved.card_count,
    }))
}

/// List a user's saved sets, newest first.
#[utoipa::path(
    get,
    path = "/users/{user_id}/flashcard-sets",
    params(("user_id" = Uuid, Path, description = "The owner of the sets.")),
    responses(
        (status = 200, description = "Saved sets", body = Vec<FlashcardSetSummary>),
        (status = 422, description = "Malformed user id", body = ErrorBody),
        (status = 502, description = "Storage failed", body = ErrorBody)
    )
)]
pub async fn list_flashcard_sets_handler(
    State(state): State<Arc<AppState>>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<FlashcardSetSummary>>, ApiError> {
    let Path(user_id) = user_id.map_err(|e| ApiError::Validation(e.body_text()))?;
    let sets = state
        .db
        .list_flashcard_sets(user_id)
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(sets.into_iter().map(Into::into).collect()))
}

/// Fetch one saved set with its cards in order.
#[utoipa::path(
    get,
    path = "/flashcard-sets/{set_id}",
    params(("set_id" = Uuid, Path, description = "The id returned when the set was saved.")),
    responses(
        (status = 200, description = "The set and its cards", body = FlashcardSetResponse),
        (status = 404, description = "No such set", body = ErrorBody),
        (status = 422, description = "Malformed set id", body = ErrorBody)
    )
)]
pub async fn get_flashcard_set_handler(
    State(state): State<Arc<AppState>>,
    set_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<FlashcardSetResponse>, ApiError> {
    let Path(set_id) = set_id.map_err(|e| ApiError::Validation(e.body_text()))?;
    let detail = state
        .db
        .get_flashcard_set(set_id)
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(detail.into()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

//=========================================================================================
// Helpers
//=========================================================================================

fn flashcard_request(state: &AppState, params: &GenerateRequest) -> Result<FlashcardRequest, ApiError> {
    let request = FlashcardRequest::new(params.num_flash_cards, params.optional_instructions.clone())?
        .ensure_at_most(state.config.max_flashcards)?;
    Ok(request)
}

async fn generate_from_params(
    state: &AppState,
    params: GenerateRequest,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request = flashcard_request(state, &params)?;

    let workspace = match (params.file_url.as_deref(), params.upload_id) {
        (Some(_), Some(_)) => {
            return Err(ApiError::Validation(
                "Provide either file_url or upload_id, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(ApiError::Validation(
                "Either file_url or upload_id is required".to_string(),
            ))
        }
        (Some(url), None) => {
            let mut workspace = state.new_workspace()?;
            fetch_into(state, &mut workspace, url).await?;
            workspace
        }
        (None, Some(upload_id)) => state.uploads.take(upload_id).await.ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Upload {upload_id} does not exist, has expired or was already used"
            ))
        })?,
    };

    respond(state, workspace, request, params.user_id, params.title.as_deref()).await
}

/// Generates from the workspace, releases it, then saves the set when a user is given.
async fn respond(
    state: &AppState,
    workspace: RequestWorkspace,
    request: FlashcardRequest,
    user_id: Option<Uuid>,
    title: Option<&str>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let set = generate_from_workspace(state, &workspace, &request).await?;
    drop(workspace);

    let set_id = match user_id {
        Some(user_id) => Some(persist(state, user_id, title, &set.cards).await?.id),
        None => None,
    };
    info!(
        cards = set.cards.len(),
        attempts = set.attempts,
        "Generated flashcards"
    );
    Ok(Json(GenerateResponse {
        flashcards: set.cards.into_iter().map(Into::into).collect(),
        set_id,
    }))
}

/// Stores every file part in `workspace` and hands text fields to `on_field`.
async fn read_multipart<F>(
    workspace: &mut RequestWorkspace,
    mut multipart: Multipart,
    mut on_field: F,
) -> Result<(), ApiError>
where
    F: FnMut(&str, String) -> Result<(), ApiError> + Send,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file {}: {}", file_name, e))
                })?;
                workspace
                    .store(Some(&file_name), content_type.as_deref(), &data)
                    .await?;
            }
            None => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read field {}: {}", name, e))
                })?;
                on_field(&name, value)?;
            }
        }
    }
    Ok(())
}

fn apply_form_field(params: &mut GenerateRequest, name: &str, value: String) -> Result<(), ApiError> {
    let value = value.trim().to_string();
    match name {
        "num_flash_cards" => {
            params.num_flash_cards = value.parse().map_err(|_| {
                ApiError::Validation(format!(
                    "num_flash_cards must be a positive integer, got '{}'",
                    value
                ))
            })?;
        }
        "user_id" if !value.is_empty() => {
            params.user_id = Some(Uuid::parse_str(&value).map_err(|_| {
                ApiError::Validation(format!("user_id must be a UUID, got '{}'", value))
            })?);
        }
        "optional_instructions" => params.optional_instructions = Some(value),
        "title" => params.title = Some(value),
        "file_url" if !value.is_empty() => params.file_url = Some(value),
        // Stored uploads are only reachable through the JSON and query forms.
        "upload_id" if !value.is_empty() => {
            return Err(ApiError::Validation(
                "upload_id cannot be sent as a form field; send it in a JSON body or query string"
                    .to_string(),
            ));
        }
        _ => debug!(field = name, "Ignoring form field"),
    }
    Ok(())
}
