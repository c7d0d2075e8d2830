//! Page list retrieved from an HTTP JSON endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::HttpConfig;
use crate::fetcher::build_client;

use super::{PageList, PageRecord, SeedError, PAGE_LIST_TIME_FORMAT};

/// Page list served as a JSON array of `{link, updated_at}` records.
///
/// Follow-up queries pass the lower bound as a `timestamp` query parameter.
pub struct HttpPageList {
    client: Client,
    url: Url,
}

impl HttpPageList {
    pub fn new(config: &HttpConfig, url: &str) -> Result<Self, SeedError> {
        let client = build_client(config).map_err(|e| SeedError::Client(e.to_string()))?;
        let url = Url::parse(url).map_err(|e| SeedError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { client, url })
    }

    async fn request(&self, since: Option<DateTime<Utc>>) -> Result<Vec<PageRecord>, SeedError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(since) = since {
            request = request.query(&[("timestamp", since.format(PAGE_LIST_TIME_FORMAT).to_string())]);
        }

        let url = self.url.to_string();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SeedError::Timeout { url: url.clone() }
            } else {
                SeedError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeedError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SeedError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let records = parse_page_list(&body).map_err(|e| SeedError::Parse {
            url: url.clone(),
            message: e.to_string(),
        })?;

        debug!(url = %url, since = ?since, pages = records.len(), "Fetched page list");
        Ok(records)
    }
}

/// Parses a page list body. `null`, `[]` and an empty body are all empty lists.
pub(crate) fn parse_page_list(body: &str) -> Result<Vec<PageRecord>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<PageRecord>> = serde_json::from_str(body)?;
    Ok(records.unwrap_or_default())
}

#[async_trait]
impl PageList for HttpPageList {
    fn name(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_all(&self) -> Result<Vec<PageRecord>, SeedError> {
        self.request(None).await
    }

    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<PageRecord>, SeedError> {
        self.request(Some(since)).await
    }
}
