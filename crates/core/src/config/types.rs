use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the update ledger when `ledger_path` is not set.
pub const DEFAULT_LEDGER_FILE: &str = ".sitescrape-ledger.json";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scrape run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Line-oriented list of static targets, resolved against `site_base_url`.
    #[serde(default)]
    pub static_list_path: Option<PathBuf>,
    /// Endpoint returning the list of pages with their last update time.
    #[serde(default)]
    pub dynamic_list_url: Option<String>,
    /// Base URL that relative targets are resolved against.
    #[serde(default)]
    pub site_base_url: Option<String>,
    /// Directory that fetched content is written under.
    #[serde(default = "default_output_location")]
    pub output_location: PathBuf,
    /// Where the update ledger is kept (default: inside `output_location`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
    /// Keep polling the page list for newer updates while the queue drains.
    #[serde(default)]
    pub follow_updates: bool,
    /// Delay between follow-up polls (milliseconds).
    #[serde(default = "default_follow_poll_interval")]
    pub follow_poll_interval_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            static_list_path: None,
            dynamic_list_url: None,
            site_base_url: None,
            output_location: default_output_location(),
            ledger_path: None,
            follow_updates: false,
            follow_poll_interval_ms: default_follow_poll_interval(),
        }
    }
}

impl ScraperConfig {
    /// Resolved ledger location.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.output_location.join(DEFAULT_LEDGER_FILE))
    }
}

fn default_concurrency() -> usize {
    6
}

fn default_output_location() -> PathBuf {
    PathBuf::from("sitefiles")
}

fn default_follow_poll_interval() -> u64 {
    1000 // 1 second
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            accept_invalid_certs: false,
        }
    }
}

fn default_user_agent() -> String {
    format!("sitescrape/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
