use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sitescrape_core::{
    load_config_or_default, render_metrics, validate_config, Config, FileSeedList, FsPersister,
    HttpFetcher, HttpPageList, LogFormat, LoggingConfig, Scheduler, SchedulerSettings,
    UpdateLedger,
};

/// Exit status reported when the run is interrupted by a signal.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Mirror a website's pages into a local directory.
#[derive(Parser, Debug)]
#[command(name = "sitescrape")]
#[command(version)]
struct Args {
    /// Configuration file (TOML).
    #[arg(short, long, env = "SITESCRAPE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers.
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Static seed list, one target per line.
    #[arg(long)]
    static_list: Option<PathBuf>,

    /// URL of the updated-pages list.
    #[arg(long)]
    page_list_url: Option<String>,

    /// Base URL for relative targets.
    #[arg(long)]
    site_base_url: Option<String>,

    /// Output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep polling the page list for newer pages while the queue drains.
    #[arg(long)]
    follow_updates: bool,

    /// Write Prometheus metrics to this file after the run.
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

/// How a run ended without a fatal error.
#[derive(Debug, PartialEq, Eq)]
enum RunEnd {
    Completed,
    Interrupted,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    match run(args).await {
        Ok(RunEnd::Completed) => {}
        Ok(RunEnd::Interrupted) => std::process::exit(INTERRUPTED_EXIT_CODE),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Applies command-line values on top of file and environment configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(concurrency) = args.concurrency {
        config.scraper.concurrency = concurrency;
    }
    if let Some(path) = &args.static_list {
        config.scraper.static_list_path = Some(path.clone());
    }
    if let Some(url) = &args.page_list_url {
        config.scraper.dynamic_list_url = Some(url.clone());
    }
    if let Some(url) = &args.site_base_url {
        config.scraper.site_base_url = Some(url.clone());
    }
    if let Some(output) = &args.output {
        config.scraper.output_location = output.clone();
    }
    if args.follow_updates {
        config.scraper.follow_updates = true;
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .context("Failed to initialize logging")
}

async fn run(args: Args) -> Result<RunEnd> {
    let mut config = load_config_or_default(args.config.as_deref()).with_context(|| {
        format!(
            "Failed to load config from {:?}",
            args.config.as_deref().unwrap_or(std::path::Path::new("<defaults>"))
        )
    })?;
    apply_overrides(&mut config, &args);
    validate_config(&config).context("Configuration validation failed")?;

    init_logging(&config.logging)?;

    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("run", run_id = %run_id);
    execute(config, args.metrics_file).instrument(span).await
}

/// Runs the scrape, racing it against a shutdown signal.
async fn execute(config: Config, metrics_file: Option<PathBuf>) -> Result<RunEnd> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        output = %config.scraper.output_location.display(),
        "Configuration loaded"
    );

    let scheduler = build_scheduler(&config).await?;

    tokio::select! {
        result = scheduler.run() => {
            let stats = result.context("Scrape run failed")?;
            println!("{stats}");

            if let Some(path) = &metrics_file {
                tokio::fs::write(path, render_metrics())
                    .await
                    .with_context(|| format!("Failed to write metrics to {:?}", path))?;
                info!(path = %path.display(), "Metrics written");
            }
            Ok(RunEnd::Completed)
        }
        _ = shutdown_signal() => {
            warn!("Shutdown signal received, stopping without summary");
            Ok(RunEnd::Interrupted)
        }
    }
}

/// Wires the production collaborators from configuration.
async fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let scraper = &config.scraper;

    let fetcher = HttpFetcher::new(&config.http, scraper.site_base_url.as_deref())
        .context("Failed to create HTTP fetcher")?;
    let persister = FsPersister::new(&scraper.output_location);

    let ledger_path = scraper.ledger_path();
    let ledger = UpdateLedger::load(&ledger_path)
        .await
        .with_context(|| format!("Failed to load ledger from {:?}", ledger_path))?;
    info!(path = %ledger_path.display(), pages = ledger.len(), "Ledger loaded");

    let mut scheduler = Scheduler::new(
        SchedulerSettings::from_config(scraper),
        Arc::new(fetcher),
        Arc::new(persister),
    )
    .with_ledger(Arc::new(ledger));

    if let Some(path) = &scraper.static_list_path {
        scheduler = scheduler.with_static_seeds(Arc::new(FileSeedList::new(path)));
    }

    if let Some(url) = &scraper.dynamic_list_url {
        let page_list =
            HttpPageList::new(&config.http, url).context("Failed to create page list client")?;
        scheduler = scheduler.with_page_list(Arc::new(page_list));
    }

    Ok(scheduler)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
