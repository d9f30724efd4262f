//! Byte and text acquisition from local files and HTTP.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// A missing local file will not appear by retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// The I/O primitives a bootstrap run needs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether a local file exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Read a local file in full.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FetchError>;

    /// `GET` a URL and return the body as text.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Filesystem via `tokio::fs`, network via `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct DefaultTransport {
    client: Client,
}

impl DefaultTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        tokio::fs::read(path).await.map_err(|source| {
            let path = path.display().to_string();
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(path)
            } else {
                FetchError::Io { path, source }
            }
        })
    }

    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }
}
