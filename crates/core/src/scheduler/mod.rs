//! Run driver: seeds the work queue, runs the worker pool, reports.
//!
//! A run goes through these steps:
//! 1. push one low-priority task per static seed
//! 2. push one high-priority task per page of the page list
//! 3. close the queue, or keep polling the page list while work remains
//! 4. drain the queue with the worker pool
//! 5. save the ledger and return the tallies

mod error;

pub use error::ScrapeError;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ScraperConfig;
use crate::fetcher::Fetcher;
use crate::ledger::UpdateLedger;
use crate::metrics;
use crate::persister::Persister;
use crate::pool::{WorkerPool, DEFAULT_CONCURRENCY};
use crate::queue::WorkQueue;
use crate::seed::{PageList, PageRecord, StaticSeeds};
use crate::stats::{OutcomeCounters, RunStats};
use crate::task::Task;

/// Tunables of a run.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Keep polling the page list for newer pages while the queue drains.
    pub follow_updates: bool,
    /// Delay between follow-up polls.
    pub follow_poll_interval: Duration,
    /// Where the ledger is saved after the run. Nothing is saved when unset.
    pub ledger_path: Option<PathBuf>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            follow_updates: false,
            follow_poll_interval: Duration::from_secs(1),
            ledger_path: None,
        }
    }
}

impl SchedulerSettings {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            follow_updates: config.follow_updates,
            follow_poll_interval: Duration::from_millis(config.follow_poll_interval_ms),
            ledger_path: Some(config.ledger_path()),
        }
    }
}

/// Newest `(updated_at, target)` seen on the page list.
type Cursor = Option<(DateTime<Utc>, String)>;

fn advance_cursor(cursor: &mut Cursor, record: &PageRecord) {
    let newer = match cursor {
        Some((max, _)) => record.updated_at > *max,
        None => true,
    };
    if newer {
        *cursor = Some((record.updated_at, record.target.clone()));
    }
}

/// Orchestrates one scrape run.
pub struct Scheduler {
    settings: SchedulerSettings,
    static_seeds: Option<Arc<dyn StaticSeeds>>,
    page_list: Option<Arc<dyn PageList>>,
    fetcher: Arc<dyn Fetcher>,
    persister: Arc<dyn Persister>,
    ledger: Arc<UpdateLedger>,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        fetcher: Arc<dyn Fetcher>,
        persister: Arc<dyn Persister>,
    ) -> Self {
        Self {
            settings,
            static_seeds: None,
            page_list: None,
            fetcher,
            persister,
            ledger: Arc::new(UpdateLedger::new()),
        }
    }

    pub fn with_static_seeds(mut self, seeds: Arc<dyn StaticSeeds>) -> Self {
        self.static_seeds = Some(seeds);
        self
    }

    pub fn with_page_list(mut self, page_list: Arc<dyn PageList>) -> Self {
        self.page_list = Some(page_list);
        self
    }

    /// Use a ledger holding the update times known from earlier runs.
    pub fn with_ledger(mut self, ledger: Arc<UpdateLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &Arc<UpdateLedger> {
        &self.ledger
    }

    /// Executes the run and returns the final counts.
    pub async fn run(&self) -> Result<RunStats, ScrapeError> {
        info!(
            workers = self.settings.concurrency,
            follow_updates = self.settings.follow_updates,
            "Starting scraper"
        );

        let queue = Arc::new(WorkQueue::new());
        let cursor = self.seed(&queue).await?;
        info!(tasks = queue.len(), "Work queue seeded");

        let counters = Arc::new(OutcomeCounters::new());
        let pool = WorkerPool::new(self.settings.concurrency);
        let drain = pool.run_with_counters(
            Arc::clone(&queue),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.persister),
            Arc::clone(&self.ledger),
            Arc::clone(&counters),
        );

        match (&self.page_list, cursor) {
            (Some(page_list), Some(cursor)) if self.settings.follow_updates => {
                let follow = self.follow_updates(&queue, page_list.as_ref(), cursor, &counters);
                tokio::join!(drain, follow);
            }
            _ => {
                queue.close();
                drain.await;
            }
        }

        let stats = counters.snapshot();

        if let Some(path) = &self.settings.ledger_path {
            if let Err(e) = self.ledger.save(path).await {
                error!(path = %path.display(), error = %e, "Failed to save update ledger");
            }
        }

        info!(
            pages_scraped = stats.pages_scraped,
            pages_new = stats.pages_new,
            pages_updated = stats.pages_updated,
            pages_unchanged = stats.pages_unchanged,
            pages_failed = stats.pages_failed,
            updated_at_pages = stats.updated_at_pages,
            "{}",
            stats
        );
        Ok(stats)
    }

    fn push(&self, queue: &WorkQueue, task: Task) -> Result<(), ScrapeError> {
        let priority = task.priority();
        queue.push(task).map_err(ScrapeError::QueueClosedPrematurely)?;
        metrics::TASKS_QUEUED
            .with_label_values(&[priority.as_str()])
            .inc();
        Ok(())
    }

    /// Fills the queue from both sources. Returns the page-list cursor when
    /// the page list was read successfully.
    async fn seed(&self, queue: &WorkQueue) -> Result<Option<Cursor>, ScrapeError> {
        let mut configured = 0;
        let mut failed = 0;

        if let Some(seeds) = &self.static_seeds {
            configured += 1;
            info!(source = seeds.name(), "Loading static seed list");
            match seeds.load().await {
                Ok(targets) => {
                    let count = targets.len();
                    for target in targets {
                        match Task::seed(target) {
                            Ok(task) => self.push(queue, task)?,
                            Err(e) => warn!(error = %e, "Skipping static seed"),
                        }
                    }
                    debug!(count, "Queued static seeds");
                }
                Err(e) => {
                    warn!(source = seeds.name(), error = %e, "Static seed list unavailable");
                    failed += 1;
                }
            }
        }

        let mut cursor = None;
        if let Some(page_list) = &self.page_list {
            configured += 1;
            info!(source = page_list.name(), "Fetching page list");
            match page_list.fetch_all().await {
                Ok(records) => {
                    let mut newest: Cursor = None;
                    let count = records.len();
                    for record in records {
                        advance_cursor(&mut newest, &record);
                        match Task::updated_page(record.target, record.updated_at) {
                            Ok(task) => self.push(queue, task)?,
                            Err(e) => warn!(error = %e, "Skipping page list entry"),
                        }
                    }
                    debug!(count, "Queued pages from page list");
                    cursor = Some(newest);
                }
                Err(e) => {
                    warn!(source = page_list.name(), error = %e, "Page list unavailable");
                    failed += 1;
                }
            }
        }

        if failed == configured {
            return Err(ScrapeError::SeedsUnavailable);
        }

        Ok(cursor)
    }

    /// Polls the page list for pages newer than the cursor while the queue
    /// still holds work, then closes the queue.
    async fn follow_updates(
        &self,
        queue: &WorkQueue,
        page_list: &dyn PageList,
        mut cursor: Cursor,
        counters: &OutcomeCounters,
    ) {
        while !queue.is_empty() {
            let since = cursor
                .as_ref()
                .map(|(updated_at, _)| *updated_at)
                .unwrap_or_default();
            info!(since = %since, "Fetching pages updated since");

            let records = match page_list.fetch_since(since).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "Follow-up poll failed, no longer following updates");
                    break;
                }
            };

            for record in records {
                // The newest page tends to come back on every poll.
                if let Some((max, target)) = &cursor {
                    if record.updated_at == *max && record.target == *target {
                        continue;
                    }
                }
                advance_cursor(&mut cursor, &record);

                let task = match Task::updated_page(record.target, record.updated_at) {
                    Ok(task) => task,
                    Err(e) => {
                        warn!(error = %e, "Skipping page list entry");
                        continue;
                    }
                };
                if let Err(e) = self.push(queue, task) {
                    warn!(error = %e, "Queue closed while following updates");
                    break;
                }
                counters.record_updated_at_page();
            }

            tokio::time::sleep(self.settings.follow_poll_interval).await;
        }

        debug!("Stopped following updates, closing queue");
        queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{day, page_record};
    use crate::testing::{MockFetcher, MockPageList, MockPersister, MockSeeds};

    fn scheduler(fetcher: Arc<MockFetcher>, persister: Arc<MockPersister>) -> Scheduler {
        Scheduler::new(SchedulerSettings::default(), fetcher, persister)
    }

    #[test]
    fn test_settings_from_config() {
        let config = ScraperConfig {
            concurrency: 3,
            follow_updates: true,
            follow_poll_interval_ms: 250,
            ..Default::default()
        };
        let settings = SchedulerSettings::from_config(&config);
        assert_eq!(settings.concurrency, 3);
        assert!(settings.follow_updates);
        assert_eq!(settings.follow_poll_interval, Duration::from_millis(250));
        assert_eq!(settings.ledger_path, Some(config.ledger_path()));
    }

    #[test]
    fn test_advance_cursor_keeps_newest() {
        let mut cursor = None;
        advance_cursor(&mut cursor, &page_record("a", day(1, 2)));
        advance_cursor(&mut cursor, &page_record("b", day(1, 1)));
        assert_eq!(cursor, Some((day(1, 2), "a".to_string())));
        advance_cursor(&mut cursor, &page_record("c", day(1, 3)));
        assert_eq!(cursor, Some((day(1, 3), "c".to_string())));
    }

    #[tokio::test]
    async fn test_high_priority_pages_fetched_first() {
        let fetcher = Arc::new(MockFetcher::new());
        let persister = Arc::new(MockPersister::new());
        let settings = SchedulerSettings {
            concurrency: 1,
            ..Default::default()
        };

        let stats = Scheduler::new(settings, fetcher.clone(), persister)
            .with_static_seeds(Arc::new(MockSeeds::with_targets(["a.html", "b.html"])))
            .with_page_list(Arc::new(MockPageList::with_records(vec![page_record(
                "c.html",
                day(3, 1),
            )])))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.pages_scraped, 3);
        assert_eq!(
            fetcher.fetched_targets().await,
            vec!["c.html", "a.html", "b.html"]
        );
    }

    #[tokio::test]
    async fn test_no_sources_configured_is_unavailable() {
        let result = scheduler(Arc::new(MockFetcher::new()), Arc::new(MockPersister::new()))
            .run()
            .await;
        assert!(matches!(result, Err(ScrapeError::SeedsUnavailable)));
    }

    #[tokio::test]
    async fn test_empty_sources_finish_with_zero_stats() {
        let stats = scheduler(Arc::new(MockFetcher::new()), Arc::new(MockPersister::new()))
            .with_static_seeds(Arc::new(MockSeeds::with_targets(Vec::<String>::new())))
            .with_page_list(Arc::new(MockPageList::new()))
            .run()
            .await
            .unwrap();
        assert_eq!(stats, RunStats::default());
    }

    #[tokio::test]
    async fn test_unwritable_ledger_still_reports_stats() {
        let temp = tempfile::TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let fetcher = Arc::new(MockFetcher::new());
        let settings = SchedulerSettings {
            ledger_path: Some(blocker.join("ledger.json")),
            ..Default::default()
        };
        let stats = Scheduler::new(settings, fetcher.clone(), Arc::new(MockPersister::new()))
            .with_static_seeds(Arc::new(MockSeeds::with_targets(["a.html", "b.html"])))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.pages_scraped, 2);
        assert_eq!(stats.pages_new, 2);
        assert_eq!(fetcher.fetch_count().await, 2);
    }

    #[tokio::test]
    async fn test_follow_updates_queues_newer_pages() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_latency(Duration::from_millis(50)).await;
        let persister = Arc::new(MockPersister::new());

        let page_list = Arc::new(MockPageList::with_records(vec![
            page_record("b.html", day(2, 1)),
            page_record("c.html", day(3, 1)),
        ]));
        // The newest known page comes back alongside a genuinely new one.
        page_list
            .push_since_response(vec![
                page_record("c.html", day(3, 1)),
                page_record("d.html", day(4, 1)),
            ])
            .await;

        let settings = SchedulerSettings {
            concurrency: 1,
            follow_updates: true,
            follow_poll_interval: Duration::from_millis(10),
            ledger_path: None,
        };
        let stats = Scheduler::new(settings, fetcher.clone(), persister)
            .with_static_seeds(Arc::new(MockSeeds::with_targets(["a.html"])))
            .with_page_list(page_list.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.updated_at_pages, 1);
        assert_eq!(stats.pages_scraped, 4);
        let since_calls = page_list.since_calls().await;
        assert_eq!(since_calls.first(), Some(&day(3, 1)));
        assert!(fetcher.fetched_targets().await.contains(&"d.html".to_string()));
    }

    #[tokio::test]
    async fn test_follow_poll_failure_still_drains_queue() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_latency(Duration::from_millis(20)).await;

        let page_list = Arc::new(MockPageList::with_records(vec![
            page_record("b.html", day(2, 1)),
            page_record("c.html", day(3, 1)),
        ]));
        page_list.push_since_failure(500).await;

        let settings = SchedulerSettings {
            concurrency: 1,
            follow_updates: true,
            follow_poll_interval: Duration::from_millis(10),
            ledger_path: None,
        };
        let stats = Scheduler::new(settings, fetcher, Arc::new(MockPersister::new()))
            .with_static_seeds(Arc::new(MockSeeds::with_targets(["a.html"])))
            .with_page_list(page_list)
            .run()
            .await
            .unwrap();

        assert_eq!(stats.pages_scraped, 3);
        assert_eq!(stats.updated_at_pages, 0);
    }
}
