//! Prometheus metrics for a scrape run.
//!
//! This module provides metrics for:
//! - Page outcomes (new, updated, unchanged, failed)
//! - Fetch latency
//! - Tasks queued by priority class

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, Histogram, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// Registry holding every scraper metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            warn!(error = %e, "Failed to register metric");
        }
    }
    registry
});

/// Processed pages by outcome.
pub static PAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sitescrape_pages_total", "Total pages processed"),
        &["outcome"], // "new", "updated", "unchanged", "failed"
    )
    .unwrap()
});

/// Fetch duration in seconds, successful or not.
pub static FETCH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "sitescrape_fetch_duration_seconds",
            "Duration of page fetches",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

/// Tasks pushed onto the work queue by priority class.
pub static TASKS_QUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sitescrape_tasks_queued_total", "Total tasks queued"),
        &["priority"], // "high", "low"
    )
    .unwrap()
});

fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PAGES_TOTAL.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(TASKS_QUEUED.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
