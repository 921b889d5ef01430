//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP callers.

use crate::adapters::extractor::ExtractionError;
use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flashcards_core::{GenerationError, PortError, RequestError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller sent something we cannot work with (no documents, bad multipart data).
    #[error("{0}")]
    BadRequest(String),

    /// The remote document could not be fetched.
    #[error("Failed to download document: {0}")]
    Download(String),

    /// The request was well-formed HTTP but its content is invalid.
    #[error("{0}")]
    Validation(String),

    #[error("Failed to load document: {0}")]
    Extraction(#[from] ExtractionError),

    /// The text-generation service failed outright.
    #[error("Text generation service error: {0}")]
    Service(String),

    /// The model never produced valid flashcards within the attempt budget.
    #[error("Failed to generate flashcards: {0}")]
    Generation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to access flashcard storage: {0}")]
    Persistence(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The error envelope returned to HTTP callers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Download(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Extraction(_) | Self::Service(_) | Self::Generation(_) | Self::Persistence(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps a storage port failure, keeping "not found" distinct.
    pub fn from_store(e: PortError) -> Self {
        match e {
            PortError::NotFound(what) => Self::NotFound(what),
            PortError::Unexpected(reason) => Self::Persistence(reason),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Service(inner) => Self::Service(inner.to_string()),
            other => Self::Generation(other.to_string()),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(e: RequestError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", self);
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
