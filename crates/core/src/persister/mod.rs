//! Durable storage of fetched content.

mod fs;

pub use fs::FsPersister;

use async_trait::async_trait;
use reqwest::Url;
use std::path::PathBuf;
use thiserror::Error;

use crate::fetcher::FetchedPage;

/// Key used when a target has no path.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Errors that can occur while persisting a page.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The target cannot be mapped to a storage key.
    #[error("Invalid storage key for {target}: {reason}")]
    InvalidKey { target: String, reason: String },

    /// Failed to create a destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the content.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where and how much was written for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReceipt {
    /// Storage key derived from the target.
    pub key: String,
    /// Final location of the content.
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Writes fetched content to durable storage.
///
/// Shared by all workers; implementations must accept concurrent calls,
/// including concurrent writes of the same target.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Implementation name for logging.
    fn name(&self) -> &str;

    /// Stores the page under the key derived from `target`.
    async fn persist(&self, target: &str, page: &FetchedPage)
        -> Result<PersistReceipt, PersistError>;
}

/// Derives the relative storage key of a target.
///
/// The URL path (or the target itself when it is not an absolute URL) loses its
/// leading `/`. An empty path maps to `index.html` and a last segment without an
/// extension is treated as a directory holding `index.html`.
pub fn storage_key(target: &str) -> Result<String, PersistError> {
    let path = match Url::parse(target) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => target
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let mut key = path.trim_start_matches('/').to_string();

    if key.split('/').any(|segment| segment == "..") {
        return Err(PersistError::InvalidKey {
            target: target.to_string(),
            reason: "parent directory segment".to_string(),
        });
    }

    if key.is_empty() {
        return Ok(INDEX_DOCUMENT.to_string());
    }

    let last_segment = key.rsplit('/').next().unwrap_or_default();
    if !last_segment.contains('.') {
        if !key.ends_with('/') {
            key.push('/');
        }
        key.push_str(INDEX_DOCUMENT);
    }

    Ok(key)
}
