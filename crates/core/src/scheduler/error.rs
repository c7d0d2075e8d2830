//! Error types for the scheduler module.

use thiserror::Error;

use crate::queue::QueueError;

/// Errors that abort a scrape run.
///
/// Failures of individual tasks are never reported here; they are logged and
/// counted by the worker pool.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Every configured seed source failed, so there is nothing to scrape.
    #[error("No seed source could be read")]
    SeedsUnavailable,

    /// The work queue rejected a task while it was still being seeded.
    #[error("Work queue closed while seeding: {0}")]
    QueueClosedPrematurely(#[source] QueueError),
}
