//! services/api/src/web/router.rs
//!
//! Assembles the HTTP router: API routes, CORS, body limits, request tracing
//! and the Swagger UI.

use crate::config::AllowedOrigins;
use crate::web::rest::{
    get_flashcard_set_handler, generate_handler, generate_query_handler, health_handler,
    list_flashcard_sets_handler, save_flashcards_handler, upload_handler, ApiDoc,
};
use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Builds the complete application router for the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let body_limit = state.config.max_upload_bytes;

    let api_router = Router::new()
        .route("/upload", post(upload_handler))
        .route("/generate", post(generate_handler).get(generate_query_handler))
        .route("/save-flashcards", post(save_flashcards_handler))
        .route("/users/{user_id}/flashcard-sets", get(list_flashcard_sets_handler))
        .route("/flashcard-sets/{set_id}", get(get_flashcard_set_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// `*` allows any origin without credentials; an explicit list allows credentials.
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    match origins {
        AllowedOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(ALLOWED_METHODS)
            .allow_headers(Any),
        AllowedOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "Ignoring an allowed origin that is not a valid header value");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_credentials(true)
                .allow_methods(ALLOWED_METHODS)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        }
    }
}
