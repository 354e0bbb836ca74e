//! WZDx Feed Monitor — Binary Entrypoint
//!
//! Runs the feed health checker either once (`--once`) or on the configured
//! interval. DataHub sync happens before each check run when a registry URL
//! is configured.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wzdx_feed_monitor::history::StatusLog;
use wzdx_feed_monitor::ingest::config::load_config_default;
use wzdx_feed_monitor::ingest::fetcher::HttpFeedFetcher;
use wzdx_feed_monitor::ingest::scheduler::{spawn_monitor, sync_tick};
use wzdx_feed_monitor::ingest::{run_once, types::FeedFetcher};
use wzdx_feed_monitor::schema::SchemaRegistry;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wzdx_feed_monitor=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default()?;
    let registry = Arc::new(SchemaRegistry::bundled());
    let log = Arc::new(StatusLog::default());
    let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFeedFetcher::new(cfg.request_timeout_secs)?);
    let feeds = Arc::new(Mutex::new(cfg.feeds.clone()));

    let once = std::env::args().any(|a| a == "--once");
    if once {
        let client = reqwest::Client::new();
        if let Some(url) = cfg.datahub_url.as_deref() {
            sync_tick(&client, url, &feeds, &cfg).await;
        }
        let snapshot = feeds.lock().expect("feed list mutex poisoned").clone();
        let summary = run_once(
            &snapshot,
            fetcher.as_ref(),
            &registry,
            &log,
            chrono::Utc::now(),
        )
        .await;
        tracing::info!(
            checked = summary.checked,
            skipped = summary.skipped,
            failed = summary.failed,
            "one-shot run complete"
        );
        return Ok(());
    }

    let handle = spawn_monitor(cfg, fetcher, registry, log, feeds);
    handle.await?;
    Ok(())
}
