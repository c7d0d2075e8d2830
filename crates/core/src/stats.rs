//! Run-level outcome tallies.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a successfully persisted page relates to what was known before the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No prior state for the page.
    New,
    /// The reported update time differs from the recorded one.
    Updated,
    /// The reported update time matches the recorded one.
    Unchanged,
}

impl Outcome {
    /// Classifies a page from its reported and previously recorded update times.
    ///
    /// Pages without a reported time (static seeds) are always new.
    pub fn classify(
        reported: Option<DateTime<Utc>>,
        recorded: Option<DateTime<Utc>>,
    ) -> Self {
        match (reported, recorded) {
            (Some(reported), Some(recorded)) if reported == recorded => Outcome::Unchanged,
            (Some(_), Some(_)) => Outcome::Updated,
            _ => Outcome::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::New => "new",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
        }
    }
}

/// Shared counters updated by every worker.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    pages_scraped: AtomicU64,
    pages_new: AtomicU64,
    pages_updated: AtomicU64,
    pages_unchanged: AtomicU64,
    pages_failed: AtomicU64,
    updated_at_pages: AtomicU64,
}

impl OutcomeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a page that was fetched and persisted.
    pub fn record_success(&self, outcome: Outcome) {
        self.pages_scraped.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Outcome::New => &self.pages_new,
            Outcome::Updated => &self.pages_updated,
            Outcome::Unchanged => &self.pages_unchanged,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task whose fetch or persist failed.
    pub fn record_failure(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a page queued by follow-up polling of the updated-pages list.
    pub fn record_updated_at_page(&self) {
        self.updated_at_pages.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            pages_scraped: self.pages_scraped.load(Ordering::Relaxed),
            pages_new: self.pages_new.load(Ordering::Relaxed),
            pages_updated: self.pages_updated.load(Ordering::Relaxed),
            pages_unchanged: self.pages_unchanged.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            updated_at_pages: self.updated_at_pages.load(Ordering::Relaxed),
        }
    }
}

/// Final counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub pages_scraped: u64,
    pub pages_new: u64,
    pub pages_updated: u64,
    pub pages_unchanged: u64,
    pub pages_failed: u64,
    pub updated_at_pages: u64,
}

impl RunStats {
    /// Tasks that were handed to a worker, successful or not.
    pub fn pages_processed(&self) -> u64 {
        self.pages_scraped + self.pages_failed
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats - Pages Scraped: {}, Pages New: {}, Pages Updated: {}",
            self.pages_scraped, self.pages_new, self.pages_updated
        )
    }
}
