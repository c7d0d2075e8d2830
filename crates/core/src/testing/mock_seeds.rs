//! Mock seed sources for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::seed::{PageList, PageRecord, SeedError, StaticSeeds};

fn unavailable(source: &str) -> SeedError {
    SeedError::Status {
        url: source.to_string(),
        status: 503,
    }
}

/// Static seed list held in memory.
#[derive(Debug, Clone)]
pub struct MockSeeds {
    targets: Option<Vec<String>>,
}

impl MockSeeds {
    /// A seed list returning `targets`.
    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: Some(targets.into_iter().map(Into::into).collect()),
        }
    }

    /// A seed list that cannot be read.
    pub fn failing() -> Self {
        Self { targets: None }
    }
}

#[async_trait]
impl StaticSeeds for MockSeeds {
    fn name(&self) -> &str {
        "mock-seeds"
    }

    async fn load(&self) -> Result<Vec<String>, SeedError> {
        self.targets
            .clone()
            .ok_or_else(|| unavailable(self.name()))
    }
}

/// Mock implementation of the PageList trait.
///
/// `fetch_all` returns the configured records. Each `fetch_since` call takes
/// the next scripted response; once the script is exhausted it returns an empty
/// list.
#[derive(Debug, Default)]
pub struct MockPageList {
    all: Arc<RwLock<Vec<PageRecord>>>,
    fail_all: Arc<RwLock<bool>>,
    since_responses: Arc<RwLock<VecDeque<Result<Vec<PageRecord>, u16>>>>,
    since_calls: Arc<RwLock<Vec<DateTime<Utc>>>>,
}

impl MockPageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page list whose full listing returns `records`.
    pub fn with_records(records: Vec<PageRecord>) -> Self {
        Self {
            all: Arc::new(RwLock::new(records)),
            ..Self::default()
        }
    }

    /// A page list whose full listing fails.
    pub fn failing() -> Self {
        Self {
            fail_all: Arc::new(RwLock::new(true)),
            ..Self::default()
        }
    }

    /// Queue the response of the next `fetch_since` call.
    pub async fn push_since_response(&self, records: Vec<PageRecord>) {
        self.since_responses.write().await.push_back(Ok(records));
    }

    /// Queue a failing `fetch_since` call answering with `status`.
    pub async fn push_since_failure(&self, status: u16) {
        self.since_responses.write().await.push_back(Err(status));
    }

    /// Lower bounds passed to `fetch_since`, in call order.
    pub async fn since_calls(&self) -> Vec<DateTime<Utc>> {
        self.since_calls.read().await.clone()
    }
}

#[async_trait]
impl PageList for MockPageList {
    fn name(&self) -> &str {
        "mock-page-list"
    }

    async fn fetch_all(&self) -> Result<Vec<PageRecord>, SeedError> {
        if *self.fail_all.read().await {
            return Err(unavailable(self.name()));
        }
        Ok(self.all.read().await.clone())
    }

    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<PageRecord>, SeedError> {
        self.since_calls.write().await.push(since);
        match self.since_responses.write().await.pop_front() {
            Some(Ok(records)) => Ok(records),
            Some(Err(status)) => Err(SeedError::Status {
                url: self.name().to_string(),
                status,
            }),
            None => Ok(Vec::new()),
        }
    }
}
