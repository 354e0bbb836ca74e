// src/ingest/fetcher.rs
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::ingest::types::{Feed, FeedFetcher};
use crate::status::FetchResult;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;

/// HTTP fetcher for feed payloads. Keeps two clients so the per-feed TLS
/// setting picks one instead of rebuilding a client per request.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    insecure_client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        // some state DOTs publish feeds behind certs that fail verification;
        // those feeds opt out via `verify_tls = false`
        let insecure_client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            insecure_client,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, feed: &Feed) -> FetchResult {
        let Some(url) = feed.url.as_deref().filter(|u| !u.is_empty()) else {
            return FetchResult::failed();
        };
        let client = if feed.verify_tls {
            &self.client
        } else {
            &self.insecure_client
        };

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(feed = %feed.name, error = %e, "feed request failed");
                return FetchResult::failed();
            }
        };

        let http_status = response.status().as_u16();
        let payload = match response.json::<Value>().await {
            Ok(v) => v,
            Err(e) => {
                // not-JSON bodies classify as Offline via the falsy rule
                warn!(feed = %feed.name, error = %e, "feed body is not valid JSON");
                Value::Null
            }
        };

        FetchResult::ok(http_status, payload)
    }

    fn name(&self) -> &'static str {
        "HttpFeedFetcher"
    }
}
