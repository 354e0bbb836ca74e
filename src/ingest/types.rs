// src/ingest/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::status::FetchResult;

/// One monitored feed, as synced from the DataHub registry or declared in
/// the static config. The classifier only ever reads `version` and the
/// fetched payload; everything else belongs to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub url: Option<String>,
    pub version: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Set when the published URL carries the key as its last query value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

fn default_true() -> bool {
    true
}

impl Feed {
    /// Inactive or URL-less feeds are skipped upstream of the classifier.
    pub fn fetchable(&self) -> bool {
        self.active && self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch a feed's payload. Transport failures are folded into the
    /// returned `FetchResult`, never surfaced as errors.
    async fn fetch(&self, feed: &Feed) -> FetchResult;
    fn name(&self) -> &'static str;
}
