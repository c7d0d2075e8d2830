//! Record of the last known update time of every scraped page.
//!
//! The ledger is what makes a page "new" or "updated": it is loaded before a
//! run, consulted and amended by workers, and written back once the pool has
//! finished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading or saving the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to read ledger {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write ledger {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    pages: BTreeMap<String, DateTime<Utc>>,
}

/// Thread-safe map of target to last recorded update time.
#[derive(Debug, Default)]
pub struct UpdateLedger {
    pages: RwLock<BTreeMap<String, DateTime<Utc>>>,
}

impl UpdateLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger from known entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, DateTime<Utc>)>) -> Self {
        Self {
            pages: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Loads the ledger at `path`. A missing file yields an empty ledger.
    pub async fn load(path: &Path) -> Result<Self, LedgerError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ledger found, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(LedgerError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let file: LedgerFile =
            serde_json::from_str(&contents).map_err(|e| LedgerError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(path = %path.display(), pages = file.pages.len(), "Loaded ledger");
        Ok(Self {
            pages: RwLock::new(file.pages),
        })
    }

    /// Last update time recorded for `target`.
    pub fn recorded(&self, target: &str) -> Option<DateTime<Utc>> {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .copied()
    }

    /// Records the update time of a persisted page, returning the time that
    /// was recorded before. An older time never replaces a newer one.
    pub fn record(&self, target: &str, updated_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        match pages.entry(target.to_string()) {
            Entry::Occupied(mut entry) => {
                let previous = *entry.get();
                if updated_at > previous {
                    entry.insert(updated_at);
                }
                Some(previous)
            }
            Entry::Vacant(entry) => {
                entry.insert(updated_at);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the ledger to `path` via a temporary file and rename.
    pub async fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let json = {
            let pages = self.pages.read().unwrap_or_else(PoisonError::into_inner);
            let file = LedgerFile {
                pages: pages.clone(),
            };
            serde_json::to_vec_pretty(&file)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let temp = path.with_extension("json.tmp");
        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| LedgerError::Write {
                path: temp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&temp, path)
            .await
            .map_err(|e| LedgerError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(path = %path.display(), bytes = json.len(), "Saved ledger");
        Ok(())
    }
}
