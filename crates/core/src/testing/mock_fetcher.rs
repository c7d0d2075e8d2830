//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, FetchedPage, Fetcher};

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Track fetched targets for assertions
/// - Fail specific targets
/// - Simulate network latency
/// - Observe the peak number of concurrent fetches
///
/// # Example
///
/// ```rust,ignore
/// use sitescrape_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.fail_target("/broken/", FetchError::Status { url: "/broken/".into(), status: 500 }).await;
///
/// // Run the pool...
///
/// assert_eq!(fetcher.fetch_count().await, 3);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    /// Targets in the order they were fetched.
    fetched: Arc<RwLock<Vec<String>>>,
    /// Targets that fail, with the error to return.
    failures: Arc<RwLock<HashMap<String, FetchError>>>,
    /// Simulated fetch duration in milliseconds.
    latency_ms: Arc<RwLock<u64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher that succeeds for every target.
    pub fn new() -> Self {
        Self {
            fetched: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            latency_ms: Arc::new(RwLock::new(0)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Body served for a target.
    pub fn body_for(target: &str) -> String {
        format!("<html><body>{target}</body></html>")
    }

    /// Make every fetch of `target` fail with `error`.
    pub async fn fail_target(&self, target: &str, error: FetchError) {
        self.failures
            .write()
            .await
            .insert(target.to_string(), error);
    }

    /// Set the simulated fetch duration.
    pub async fn set_latency(&self, duration: Duration) {
        *self.latency_ms.write().await = duration.as_millis() as u64;
    }

    /// Get all fetched targets, failed ones included.
    pub async fn fetched_targets(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }

    /// Highest number of fetches that were in progress at the same time.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, target: &str) -> Result<FetchedPage, FetchError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.fetched.write().await.push(target.to_string());

        let latency = *self.latency_ms.read().await;
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let failure = self.failures.read().await.get(target).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match failure {
            Some(error) => Err(error),
            None => Ok(FetchedPage::new(
                Self::body_for(target).into_bytes(),
                Some("text/html; charset=UTF-8".to_string()),
            )),
        }
    }
}
