//! Content retrieval.
//!
//! The worker pool only sees the [`Fetcher`] trait; [`HttpFetcher`] is the
//! production implementation backed by `reqwest`.

mod http;

pub(crate) use http::build_client;
pub use http::HttpFetcher;

use async_trait::async_trait;
use thiserror::Error;

/// Body and metadata of a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Raw response body.
    pub body: Vec<u8>,
    /// `Content-Type` header as sent by the server, parameters included.
    pub content_type: Option<String>,
}

impl FetchedPage {
    pub fn new(body: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        Self {
            body: body.into(),
            content_type,
        }
    }

    /// Media type without parameters, e.g. `text/html` for `text/html; charset=UTF-8`.
    pub fn media_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Errors that can occur while fetching a target.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The target could not be turned into a request URL.
    #[error("Invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The request did not complete in time.
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// The server could not be reached.
    #[error("Connection failed for {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Reading the response body failed.
    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Retrieves the content behind a target identifier.
///
/// Implementations are shared by all workers and must tolerate concurrent calls.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Implementation name for logging.
    fn name(&self) -> &str;

    /// Fetches one target.
    async fn fetch(&self, target: &str) -> Result<FetchedPage, FetchError>;
}
