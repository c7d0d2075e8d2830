//! Sources of the initial link set.
//!
//! Two independent sources feed the work queue: a static seed list (low
//! priority, no timestamps) and a page list reporting each page's last update
//! time (high priority).

mod file;
mod http;

pub use file::{parse_seed_list, FileSeedList};
pub use http::HttpPageList;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Naive timestamp format used by the page list, interpreted as UTC.
pub const PAGE_LIST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that can occur while reading a seed source.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("Failed to read seed list {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The page list request did not complete in time.
    #[error("Page list request timed out: {url}")]
    Timeout { url: String },

    /// The page list request failed.
    #[error("Page list request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The page list endpoint answered with a non-success status.
    #[error("Page list returned HTTP {status}: {url}")]
    Status { url: String, status: u16 },

    /// The page list body was not a list of page records.
    #[error("Failed to parse page list from {url}: {message}")]
    Parse { url: String, message: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// One entry of the page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(alias = "link", alias = "url")]
    pub target: String,
    #[serde(alias = "updatedAt", deserialize_with = "deserialize_page_time")]
    pub updated_at: DateTime<Utc>,
}

/// Parses an RFC 3339 timestamp or a naive `YYYY-MM-DD HH:MM:SS` one as UTC.
pub fn parse_page_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, PAGE_LIST_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_page_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_page_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Provides the static list of targets.
#[async_trait]
pub trait StaticSeeds: Send + Sync {
    /// Source description for logging.
    fn name(&self) -> &str;

    /// Returns every non-empty target of the list, in order.
    async fn load(&self) -> Result<Vec<String>, SeedError>;
}

/// Provides the list of pages together with their last update time.
#[async_trait]
pub trait PageList: Send + Sync {
    /// Source description for logging.
    fn name(&self) -> &str;

    /// Returns every known page.
    async fn fetch_all(&self) -> Result<Vec<PageRecord>, SeedError>;

    /// Returns pages updated at or after `since`.
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<PageRecord>, SeedError>;
}
