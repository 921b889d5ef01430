//! Shared fixtures for the HTTP integration tests: in-memory adapters and a
//! router wired to them.

#![allow(dead_code)]

use api_lib::adapters::HttpDownloadAdapter;
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Utc;
use flashcards_core::ports::{DatabaseService, PortError, PortResult, TextGenerationService};
use flashcards_core::{Flashcard, FlashcardSetDetail, SavedFlashcard, SavedFlashcardSet};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const PARIS_TEXT: &str = "Paris is the capital of France.";
pub const PARIS_REPLY: &str = r#"[{"question":"What is the capital of France?","answer":"Paris"}]"#;

//=========================================================================================
// Scripted text generation
//=========================================================================================

/// Replays scripted replies in order, then keeps returning `fallback`.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<PortResult<String>>>,
    fallback: PortResult<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<PortResult<String>>, fallback: PortResult<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(Vec::new(), Ok(reply.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Vec::new(), Err(PortError::Unexpected(reason.to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate_text(&self, prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

//=========================================================================================
// In-memory flashcard store
//=========================================================================================

#[derive(Default)]
pub struct InMemoryStore {
    sets: Mutex<Vec<FlashcardSetDetail>>,
}

impl InMemoryStore {
    pub fn set_count(&self) -> usize {
        self.sets.lock().unwrap().len()
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn save_flashcard_set(
        &self,
        user_id: Uuid,
        title: &str,
        cards: &[Flashcard],
    ) -> PortResult<SavedFlashcardSet> {
        let set = SavedFlashcardSet {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            card_count: cards.len(),
            created_at: Utc::now(),
        };
        let cards = cards
            .iter()
            .enumerate()
            .map(|(position, card)| SavedFlashcard {
                id: Uuid::new_v4(),
                set_id: set.id,
                position,
                question: card.question.clone(),
                answer: card.answer.clone(),
            })
            .collect();
        self.sets.lock().unwrap().push(FlashcardSetDetail {
            set: set.clone(),
            cards,
        });
        Ok(set)
    }

    async fn list_flashcard_sets(&self, user_id: Uuid) -> PortResult<Vec<SavedFlashcardSet>> {
        let sets = self.sets.lock().unwrap();
        Ok(sets
            .iter()
            .rev()
            .filter(|detail| detail.set.user_id == user_id)
            .map(|detail| detail.set.clone())
            .collect())
    }

    async fn get_flashcard_set(&self, set_id: Uuid) -> PortResult<FlashcardSetDetail> {
        self.sets
            .lock()
            .unwrap()
            .iter()
            .find(|detail| detail.set.id == set_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Flashcard set {} not found", set_id)))
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub generator: Arc<ScriptedGenerator>,
    pub store: Arc<InMemoryStore>,
    pub state: Arc<AppState>,
    pub temp_root: TempDir,
}

impl TestApp {
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self::with_vars(generator, &[])
    }

    pub fn with_vars(generator: ScriptedGenerator, extra: &[(&str, &str)]) -> Self {
        let temp_root = tempfile::tempdir().unwrap();
        let mut vars: HashMap<String, String> = [
            ("DATABASE_URL", "postgres://localhost/flashcards_test"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ALLOWED_ORIGINS", "*"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.insert(
            "TEMP_DIR".to_string(),
            temp_root.path().to_string_lossy().into_owned(),
        );
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned()).unwrap());

        let generator = Arc::new(generator);
        let store = Arc::new(InMemoryStore::default());
        let downloader =
            Arc::new(HttpDownloadAdapter::new(Duration::from_secs(5), 1024 * 1024).unwrap());
        let state = Arc::new(AppState::new(
            config,
            store.clone(),
            generator.clone(),
            downloader,
        ));

        Self {
            router: build_router(state.clone()),
            generator,
            store,
            state,
            temp_root,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Number of request workspaces still on disk.
    pub fn workspaces_on_disk(&self) -> usize {
        std::fs::read_dir(self.temp_root.path()).unwrap().count()
    }
}

//=========================================================================================
// Request builders
//=========================================================================================

const BOUNDARY: &str = "flashcards-test-boundary";

pub struct FilePart<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_request(uri: &str, files: &[FilePart<'_>], fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn paris_file() -> FilePart<'static> {
    FilePart {
        file_name: "notes.txt",
        content_type: "text/plain",
        bytes: PARIS_TEXT.as_bytes(),
    }
}
