//! Fixed-size pool of workers draining the work queue.
//!
//! Each worker loops: pop a task, fetch it, persist it, classify it against the
//! ledger, count it. A failed task is logged and counted, and never stops the
//! worker. `run` returns once every worker has observed [`Dequeued::Stop`].

use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::fetcher::Fetcher;
use crate::ledger::UpdateLedger;
use crate::metrics;
use crate::persister::Persister;
use crate::queue::{Dequeued, WorkQueue};
use crate::stats::{Outcome, OutcomeCounters, RunStats};
use crate::task::Task;

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Everything a worker needs besides the queue.
struct WorkerShared {
    fetcher: Arc<dyn Fetcher>,
    persister: Arc<dyn Persister>,
    ledger: Arc<UpdateLedger>,
    counters: Arc<OutcomeCounters>,
}

impl WorkerShared {
    async fn run(&self, worker: usize, queue: &WorkQueue) {
        debug!(worker, "Worker started");
        let mut processed = 0u64;
        loop {
            match queue.pop().await {
                Dequeued::Task(task) => {
                    let target = task.target().to_string();
                    let result = AssertUnwindSafe(self.process(worker, task))
                        .catch_unwind()
                        .await;
                    if let Err(panic) = result {
                        error!(
                            worker,
                            page = %target,
                            panic = panic_message(panic.as_ref()),
                            "Page processing panicked"
                        );
                        self.record_failure();
                    }
                    processed += 1;
                }
                Dequeued::Stop => break,
            }
        }
        debug!(worker, processed, "Worker stopped");
    }

    async fn process(&self, worker: usize, task: Task) {
        let target = task.target();
        info!(worker, page = target, priority = %task.priority(), "Scraping");

        let fetch_start = Instant::now();
        let fetched = self.fetcher.fetch(target).await;
        metrics::FETCH_DURATION.observe(fetch_start.elapsed().as_secs_f64());

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!(worker, page = target, error = %e, "Fetch failed");
                self.record_failure();
                return;
            }
        };

        let receipt = match self.persister.persist(target, &page).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(worker, page = target, error = %e, "Persist failed");
                self.record_failure();
                return;
            }
        };

        // Swap in the new time and read the previous one under a single lock.
        let previous = task
            .updated_at()
            .and_then(|updated_at| self.ledger.record(target, updated_at));
        let outcome = Outcome::classify(task.updated_at(), previous);

        self.counters.record_success(outcome);
        metrics::PAGES_TOTAL
            .with_label_values(&[outcome.as_str()])
            .inc();

        debug!(
            worker,
            page = target,
            key = %receipt.key,
            bytes = receipt.bytes_written,
            outcome = outcome.as_str(),
            "Page stored"
        );
    }

    fn record_failure(&self) {
        self.counters.record_failure();
        metrics::PAGES_TOTAL.with_label_values(&["failed"]).inc();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Runs a fixed number of workers against a [`WorkQueue`].
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl WorkerPool {
    /// Creates a pool; `concurrency` is clamped to at least 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drains the queue with fresh counters and returns the final tallies.
    pub async fn run(
        &self,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn Fetcher>,
        persister: Arc<dyn Persister>,
        ledger: Arc<UpdateLedger>,
    ) -> RunStats {
        let counters = Arc::new(OutcomeCounters::new());
        self.run_with_counters(queue, fetcher, persister, ledger, counters)
            .await
    }

    /// Drains the queue, recording into `counters`, which may be shared with
    /// whoever keeps feeding the queue.
    pub async fn run_with_counters(
        &self,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn Fetcher>,
        persister: Arc<dyn Persister>,
        ledger: Arc<UpdateLedger>,
        counters: Arc<OutcomeCounters>,
    ) -> RunStats {
        info!(
            workers = self.concurrency,
            fetcher = fetcher.name(),
            persister = persister.name(),
            "Starting worker pool"
        );

        let shared = Arc::new(WorkerShared {
            fetcher,
            persister,
            ledger,
            counters: Arc::clone(&counters),
        });

        let handles: Vec<_> = (0..self.concurrency)
            .map(|worker| {
                let shared = Arc::clone(&shared);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { shared.run(worker, &queue).await })
            })
            .collect();

        let results = join_all(handles).await;
        for (worker, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                error!(worker, error = %e, "Worker task terminated unexpectedly");
            }
        }

        let stats = counters.snapshot();
        info!(
            scraped = stats.pages_scraped,
            failed = stats.pages_failed,
            "Worker pool finished"
        );
        stats
    }
}
