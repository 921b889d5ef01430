//! services/api/src/adapters/downloader.rs
//!
//! This module contains the HTTP adapter that fetches remote documents.
//! It implements the `DocumentDownloadService` port from the `core` crate.

use async_trait::async_trait;
use bytes::BytesMut;
use flashcards_core::ports::{DocumentDownloadService, PortError, PortResult};
use flashcards_core::RemoteDocument;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Downloads documents over HTTP(S) with a timeout and a size cap.
#[derive(Clone)]
pub struct HttpDownloadAdapter {
    client: Client,
    max_bytes: usize,
}

impl HttpDownloadAdapter {
    /// Creates a new `HttpDownloadAdapter`.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_bytes })
    }

    fn file_name_from(url: &Url) -> Option<String> {
        url.path_segments()?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
    }
}

//=========================================================================================
// `DocumentDownloadService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentDownloadService for HttpDownloadAdapter {
    async fn download(&self, url: &str) -> PortResult<RemoteDocument> {
        let url = Url::parse(url).map_err(|e| PortError::Unexpected(format!("invalid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PortError::Unexpected(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!("server responded with {status}")));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(PortError::Unexpected(format!(
                    "document is {length} bytes, the limit is {}",
                    self.max_bytes
                )));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // Chunked replies carry no length, so the cap is enforced while reading.
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(PortError::Unexpected(format!(
                    "document is at least {} bytes, the limit is {}",
                    body.len() + chunk.len(),
                    self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        let bytes = body.freeze();
        if bytes.is_empty() {
            return Err(PortError::Unexpected("downloaded document is empty".to_string()));
        }

        info!(%url, bytes = bytes.len(), "Downloaded remote document");
        Ok(RemoteDocument {
            file_name: Self::file_name_from(&url),
            content_type,
            bytes,
        })
    }
}
