// src/ingest/mod.rs
pub mod config;
pub mod datahub;
pub mod fetcher;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::history::StatusLog;
use crate::ingest::types::{Feed, FeedFetcher};
use crate::schema::SchemaRegistry;
use crate::status::StatusVerdict;

/// One-time metrics registration (so series show up with help text).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feedcheck_checked_total",
            "Feeds classified successfully across all runs."
        );
        describe_counter!(
            "feedcheck_skipped_total",
            "Feeds skipped because they are inactive or have no URL."
        );
        describe_counter!(
            "feedcheck_failed_total",
            "Feeds whose status could not be determined."
        );
        describe_gauge!(
            "feedcheck_last_run_ts",
            "Unix ts when a check run last finished."
        );
    });
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One classification run: every feed, sequentially, with per-feed failure
/// isolation. One feed's failure never aborts the run.
pub async fn run_once(
    feeds: &[Feed],
    fetcher: &dyn FeedFetcher,
    registry: &Arc<SchemaRegistry>,
    log: &Arc<StatusLog>,
    now: DateTime<Utc>,
) -> RunSummary {
    ensure_metrics_described();
    let mut summary = RunSummary::default();

    for feed in feeds {
        if !feed.fetchable() {
            debug!(feed = %feed.name, "inactive or URL-less feed, skipping");
            summary.skipped += 1;
            continue;
        }

        info!(feed = %feed.name, url = feed.url.as_deref().unwrap_or(""), "checking feed");
        let fetch = fetcher.fetch(feed).await;

        // classification can block on the registry's uncached-schema path
        let reg = Arc::clone(registry);
        let name = feed.name.clone();
        let version = feed.version.clone();
        let outcome =
            tokio::task::spawn_blocking(move || classify(&reg, &name, &version, &fetch, now))
                .await;

        match outcome {
            Ok(Ok(status)) => {
                let stored = log.record(&feed.name, StatusVerdict::new(status, now));
                if stored.is_error() {
                    warn!(
                        feed = %feed.name,
                        status = stored.kind().label(),
                        detail = %stored.summary(),
                        "feed is unhealthy"
                    );
                } else {
                    info!(feed = %feed.name, "feed is ok");
                }
                summary.checked += 1;
            }
            Ok(Err(e)) => {
                // "could not determine status": report and move on
                warn!(feed = %feed.name, error = %e, "could not determine feed status");
                summary.failed += 1;
            }
            Err(e) => {
                warn!(feed = %feed.name, error = %e, "classification task panicked");
                summary.failed += 1;
            }
        }
    }

    counter!("feedcheck_checked_total").increment(summary.checked as u64);
    counter!("feedcheck_skipped_total").increment(summary.skipped as u64);
    counter!("feedcheck_failed_total").increment(summary.failed as u64);
    gauge!("feedcheck_last_run_ts").set(now.timestamp() as f64);

    info!(
        checked = summary.checked,
        skipped = summary.skipped,
        failed = summary.failed,
        "finished analyzing feeds"
    );
    summary
}
