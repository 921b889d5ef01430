//! services/api/src/web/workspace.rs
//!
//! Request-scoped file storage.
//!
//! Every request that stores documents gets its own `RequestWorkspace`, a uniquely
//! named temporary directory that is removed when the workspace is dropped. Uploads
//! that must outlive their request are parked in the `UploadRegistry` until a
//! generate request claims them.

use flashcards_core::{Document, DocumentFormat};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DIR_PREFIX: &str = "flashcards-";
const FALLBACK_NAME: &str = "document";

//=========================================================================================
// RequestWorkspace
//=========================================================================================

/// An isolated temporary directory holding the documents of one request.
#[derive(Debug)]
pub struct RequestWorkspace {
    dir: TempDir,
    documents: Vec<Document>,
    stored: Vec<String>,
}

impl RequestWorkspace {
    /// Creates a fresh directory, under `root` when given, otherwise under the system temp dir.
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DIR_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Created request workspace");
        Ok(Self {
            dir,
            documents: Vec::new(),
            stored: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes one file into the workspace and returns the name it was stored under.
    ///
    /// The format is taken from the file name, falling back to `content_type`. Files
    /// of an unsupported format are kept on disk but are not offered for extraction.
    pub async fn store(
        &mut self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let mut name = sanitize_file_name(file_name.unwrap_or(FALLBACK_NAME));
        let format = DocumentFormat::from_file_name(&name)
            .or_else(|| content_type.and_then(DocumentFormat::from_mime));
        if let Some(format) = format {
            if DocumentFormat::from_file_name(&name).is_none() {
                name = format!("{}.{}", name, format.extension());
            }
        }
        let name = self.unique_name(name);

        let path = self.dir.path().join(&name);
        tokio::fs::write(&path, bytes).await?;

        match format {
            Some(format) => self.documents.push(Document {
                file_name: name.clone(),
                format,
                path,
            }),
            None => warn!(file = %name, "Stored a file of an unsupported format; it will be skipped"),
        }
        self.stored.push(name.clone());
        Ok(name)
    }

    /// The stored files that can be extracted, in upload order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Every stored file name, in upload order.
    pub fn file_names(&self) -> &[String] {
        &self.stored
    }

    fn unique_name(&self, name: String) -> String {
        let mut candidate = name.clone();
        let mut n = 0;
        while self.stored.contains(&candidate) {
            n += 1;
            candidate = format!("{n}-{name}");
        }
        candidate
    }
}

/// Keeps only the final path component and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

//=========================================================================================
// UploadRegistry
//=========================================================================================

struct UploadBatch {
    workspace: RequestWorkspace,
    created: Instant,
}

/// Uploaded workspaces waiting to be claimed by a generate request.
///
/// A batch can be taken exactly once. Batches older than the TTL are dropped, and
/// their directories deleted, whenever a new batch is registered.
#[derive(Clone)]
pub struct UploadRegistry {
    ttl: Duration,
    batches: Arc<Mutex<HashMap<Uuid, UploadBatch>>>,
}

impl UploadRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            batches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a workspace and returns the id that claims it.
    pub async fn insert(&self, workspace: RequestWorkspace) -> Uuid {
        let mut batches = self.batches.lock().await;
        let ttl = self.ttl;
        let before = batches.len();
        batches.retain(|_, batch| batch.created.elapsed() < ttl);
        let expired = before - batches.len();
        if expired > 0 {
            info!(expired, "Discarded unclaimed uploads");
        }

        let id = Uuid::new_v4();
        batches.insert(
            id,
            UploadBatch {
                workspace,
                created: Instant::now(),
            },
        );
        id
    }

    /// Removes and returns the workspace for `id`, unless it is unknown or expired.
    pub async fn take(&self, id: Uuid) -> Option<RequestWorkspace> {
        let batch = self.batches.lock().await.remove(&id)?;
        if batch.created.elapsed() >= self.ttl {
            info!(upload_id = %id, "Upload expired before it was claimed");
            return None;
        }
        Some(batch.workspace)
    }

    pub async fn len(&self) -> usize {
        self.batches.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
