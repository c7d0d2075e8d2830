//! Mock persister for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetcher::FetchedPage;
use crate::persister::{storage_key, PersistError, PersistReceipt, Persister};

/// A recorded write for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub target: String,
    pub key: String,
    pub body: Vec<u8>,
}

/// Mock implementation of the Persister trait that keeps writes in memory.
#[derive(Debug, Default)]
pub struct MockPersister {
    writes: Arc<RwLock<Vec<RecordedWrite>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MockPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write of `target` fail.
    pub async fn fail_target(&self, target: &str) {
        self.failing.write().await.insert(target.to_string());
    }

    /// Get all successful writes in order.
    pub async fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }

    /// Targets that were written successfully.
    pub async fn persisted_targets(&self) -> Vec<String> {
        self.writes
            .read()
            .await
            .iter()
            .map(|w| w.target.clone())
            .collect()
    }
}

#[async_trait]
impl Persister for MockPersister {
    fn name(&self) -> &str {
        "mock"
    }

    async fn persist(
        &self,
        target: &str,
        page: &FetchedPage,
    ) -> Result<PersistReceipt, PersistError> {
        let key = storage_key(target)?;

        if self.failing.read().await.contains(target) {
            return Err(PersistError::WriteFailed {
                path: PathBuf::from(&key),
                source: std::io::Error::other("simulated write failure"),
            });
        }

        self.writes.write().await.push(RecordedWrite {
            target: target.to_string(),
            key: key.clone(),
            body: page.body.clone(),
        });

        Ok(PersistReceipt {
            path: PathBuf::from(&key),
            key,
            bytes_written: page.len() as u64,
        })
    }
}
