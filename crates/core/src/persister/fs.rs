//! File system persister implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::debug;

use crate::fetcher::FetchedPage;

use super::{storage_key, PersistError, PersistReceipt, Persister};

/// Writes pages below a root directory, one file per storage key.
///
/// Content goes to a uniquely named temporary file next to the destination and
/// is then renamed into place, so readers never observe a partial write.
pub struct FsPersister {
    root: PathBuf,
    temp_seq: AtomicU64,
}

impl FsPersister {
    /// Creates a persister writing below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            temp_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates parent directories for a path.
    async fn ensure_parent_dirs(path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    fn temp_path_for(&self, destination: &Path) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        destination.with_file_name(format!(".{file_name}.{seq}.tmp"))
    }
}

#[async_trait]
impl Persister for FsPersister {
    fn name(&self) -> &str {
        "fs"
    }

    async fn persist(
        &self,
        target: &str,
        page: &FetchedPage,
    ) -> Result<PersistReceipt, PersistError> {
        let key = storage_key(target)?;
        let destination = self.root.join(&key);

        Self::ensure_parent_dirs(&destination).await?;

        let temp = self.temp_path_for(&destination);
        if let Err(e) = fs::write(&temp, &page.body).await {
            let _ = fs::remove_file(&temp).await;
            return Err(PersistError::WriteFailed {
                path: temp,
                source: e,
            });
        }

        if let Err(e) = fs::rename(&temp, &destination).await {
            let _ = fs::remove_file(&temp).await;
            return Err(PersistError::WriteFailed {
                path: destination,
                source: e,
            });
        }

        debug!(
            page = target,
            key = %key,
            bytes = page.len(),
            "Persisted page"
        );

        Ok(PersistReceipt {
            key,
            path: destination,
            bytes_written: page.len() as u64,
        })
    }
}
