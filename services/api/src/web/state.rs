//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::extractor::DocumentExtractor;
use crate::config::Config;
use crate::web::workspace::{RequestWorkspace, UploadRegistry};
use flashcards_core::ports::{DatabaseService, DocumentDownloadService, TextGenerationService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub generator: Arc<dyn TextGenerationService>,
    pub downloader: Arc<dyn DocumentDownloadService>,
    pub extractor: DocumentExtractor,
    pub uploads: UploadRegistry,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        generator: Arc<dyn TextGenerationService>,
        downloader: Arc<dyn DocumentDownloadService>,
    ) -> Self {
        let uploads = UploadRegistry::new(config.upload_ttl);
        Self {
            db,
            config,
            generator,
            downloader,
            extractor: DocumentExtractor::new(),
            uploads,
        }
    }

    /// Opens a fresh workspace under the configured temp directory.
    pub fn new_workspace(&self) -> std::io::Result<RequestWorkspace> {
        RequestWorkspace::create(self.config.temp_dir.as_deref())
    }
}
