// src/ingest/scheduler.rs
use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::history::StatusLog;
use crate::ingest::config::MonitorConfig;
use crate::ingest::types::{Feed, FeedFetcher};
use crate::ingest::{datahub, run_once};
use crate::schema::SchemaRegistry;

/// Shared, mutable feed list: the scheduler replaces it on each DataHub
/// sync; a one-shot run just reads it.
pub type FeedList = Arc<Mutex<Vec<Feed>>>;

/// Spawn the periodic monitor loop: each tick optionally syncs the feed
/// list from DataHub, then classifies every feed. Tick failures are logged
/// and the loop keeps going.
pub fn spawn_monitor(
    cfg: MonitorConfig,
    fetcher: Arc<dyn FeedFetcher>,
    registry: Arc<SchemaRegistry>,
    log: Arc<StatusLog>,
    feeds: FeedList,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;

            if let Some(url) = cfg.datahub_url.as_deref() {
                sync_tick(&client, url, &feeds, &cfg).await;
            }

            let snapshot = feeds.lock().expect("feed list mutex poisoned").clone();
            let now = chrono::Utc::now();
            run_once(&snapshot, fetcher.as_ref(), &registry, &log, now).await;
            counter!("feedcheck_runs_total").increment(1);
        }
    })
}

/// One DataHub sync attempt. A registry failure leaves the current feed
/// list untouched.
pub async fn sync_tick(client: &reqwest::Client, url: &str, feeds: &FeedList, cfg: &MonitorConfig) {
    match datahub::fetch_rows(client, url).await {
        Ok(rows) => {
            let mut list = feeds.lock().expect("feed list mutex poisoned");
            let summary = datahub::sync_feeds(&rows, &mut list, &cfg.api_keys);
            info!(
                added = summary.added,
                updated = summary.updated,
                removed = summary.removed,
                skipped = summary.skipped,
                "synced feed list with DataHub"
            );
        }
        Err(e) => {
            error!(error = %e, "DataHub sync failed, keeping current feed list");
        }
    }
}
