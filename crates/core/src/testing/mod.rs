//! Testing utilities and mock implementations of the collaborator traits.
//!
//! The mocks let the worker pool and scheduler be exercised end to end
//! without network access or a real output directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use sitescrape_core::testing::{MockFetcher, MockPageList, MockPersister, MockSeeds};
//!
//! let seeds = MockSeeds::with_targets(["a.html", "b.html"]);
//! let pages = MockPageList::with_records(vec![fixtures::page_record("c.html", t1)]);
//! let fetcher = MockFetcher::new();
//! let persister = MockPersister::new();
//! ```

mod mock_fetcher;
mod mock_persister;
mod mock_seeds;

pub use mock_fetcher::MockFetcher;
pub use mock_persister::{MockPersister, RecordedWrite};
pub use mock_seeds::{MockPageList, MockSeeds};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::seed::PageRecord;

    /// Create a page list record.
    pub fn page_record(target: &str, updated_at: DateTime<Utc>) -> PageRecord {
        PageRecord {
            target: target.to_string(),
            updated_at,
        }
    }

    /// Midnight UTC on the given day of 2024.
    pub fn day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }
}
