pub mod config;
pub mod fetcher;
pub mod ledger;
pub mod metrics;
pub mod persister;
pub mod pool;
pub mod queue;
pub mod scheduler;
pub mod seed;
pub mod stats;
pub mod task;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, HttpConfig, LogFormat, LoggingConfig, ScraperConfig,
};
pub use fetcher::{FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use ledger::{LedgerError, UpdateLedger};
pub use metrics::render_metrics;
pub use persister::{storage_key, FsPersister, PersistError, PersistReceipt, Persister};
pub use pool::{WorkerPool, DEFAULT_CONCURRENCY};
pub use queue::{Dequeued, QueueError, WorkQueue};
pub use scheduler::{ScrapeError, Scheduler, SchedulerSettings};
pub use seed::{
    parse_seed_list, FileSeedList, HttpPageList, PageList, PageRecord, SeedError, StaticSeeds,
};
pub use stats::{Outcome, OutcomeCounters, RunStats};
pub use task::{Priority, Task, TaskError};
