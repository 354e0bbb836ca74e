// src/ingest/datahub.rs
//! Feed-list synchronization against the USDOT DataHub registry.
//!
//! One sync pulls the full registry listing, upserts feeds by name, and
//! removes feeds no longer listed. Feeds that need an API key get the key
//! spliced into their URL; a needed-but-missing key keeps the previously
//! known entry instead of dropping the feed.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::ingest::types::Feed;

/// One row of the DataHub listing. The registry wraps URLs in objects and
/// omits fields freely, so everything is optional here and defaulted during
/// the sync.
#[derive(Debug, Clone, Deserialize)]
pub struct DataHubRow {
    pub feedname: Option<String>,
    pub state: Option<String>,
    pub issuingorganization: Option<String>,
    pub url: Option<UrlField>,
    pub version: Option<String>,
    pub active: Option<bool>,
    #[serde(default)]
    pub needapikey: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlField {
    pub url: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Fetch the registry listing. A registry failure aborts the sync (the
/// caller keeps its current feed list and the check run proceeds).
pub async fn fetch_rows(client: &reqwest::Client, url: &str) -> Result<Vec<DataHubRow>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("DataHub request to {url} failed"))?;
    if !response.status().is_success() {
        bail!(
            "DataHub returned invalid request status code {}",
            response.status().as_u16()
        );
    }
    response
        .json::<Vec<DataHubRow>>()
        .await
        .context("decoding DataHub feed listing")
}

/// Keyed feeds carry the key as the last `=`-delimited query value; splice
/// the configured key in place of whatever placeholder the listing has.
pub fn splice_api_key(url: &str, key: &str) -> String {
    match url.rsplit_once('=') {
        Some((head, _)) => format!("{head}={key}"),
        None => url.to_string(),
    }
}

/// Reconcile the current feed list with the registry listing.
pub fn sync_feeds(
    rows: &[DataHubRow],
    feeds: &mut Vec<Feed>,
    api_keys: &HashMap<String, String>,
) -> SyncSummary {
    let mut summary = SyncSummary::default();
    let mut next: Vec<Feed> = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(name) = row.feedname.as_deref().filter(|n| !n.is_empty()) else {
            warn!("DataHub row without a feedname, skipping");
            summary.skipped += 1;
            continue;
        };

        let existing = feeds.iter().find(|f| f.name == name);
        let listed_url = row.url.as_ref().map(|u| u.url.clone());

        let (url, api_key) = if row.needapikey {
            match api_keys.get(name) {
                Some(key) => (
                    listed_url.map(|u| splice_api_key(&u, key)),
                    Some(key.clone()),
                ),
                None => {
                    warn!(feed = name, "API key needed but not configured");
                    summary.skipped += 1;
                    // keep what we already know rather than dropping the feed
                    if let Some(known) = existing {
                        next.push(known.clone());
                    }
                    continue;
                }
            }
        } else {
            (listed_url, None)
        };

        if existing.is_some() {
            summary.updated += 1;
        } else {
            info!(feed = name, "new feed found");
            summary.added += 1;
        }

        next.push(Feed {
            name: name.to_string(),
            state: row.state.clone().unwrap_or_default(),
            organization: row.issuingorganization.clone().unwrap_or_default(),
            url,
            version: row.version.clone().unwrap_or_default(),
            active: row.active.unwrap_or(false),
            api_key,
            verify_tls: existing.map(|f| f.verify_tls).unwrap_or(true),
        });
    }

    summary.removed = feeds
        .iter()
        .filter(|f| !next.iter().any(|n| n.name == f.name))
        .count();

    *feeds = next;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, url: &str, needs_key: bool) -> DataHubRow {
        DataHubRow {
            feedname: Some(name.to_string()),
            state: Some("IA".to_string()),
            issuingorganization: Some("Iowa DOT".to_string()),
            url: Some(UrlField {
                url: url.to_string(),
            }),
            version: Some("4.2".to_string()),
            active: Some(true),
            needapikey: needs_key,
        }
    }

    #[test]
    fn splice_replaces_the_last_query_value() {
        assert_eq!(
            splice_api_key("https://x.test/feed?format=json&key=PLACEHOLDER", "SECRET"),
            "https://x.test/feed?format=json&key=SECRET"
        );
        assert_eq!(splice_api_key("https://x.test/feed", "SECRET"), "https://x.test/feed");
    }

    #[test]
    fn sync_adds_updates_and_removes() {
        let mut feeds = vec![Feed {
            name: "old".into(),
            state: String::new(),
            organization: String::new(),
            url: Some("https://old.test".into()),
            version: "3.1".into(),
            active: true,
            api_key: None,
            verify_tls: true,
        }];
        let rows = vec![row("new", "https://new.test", false)];
        let summary = sync_feeds(&rows, &mut feeds, &HashMap::new());

        assert_eq!(
            summary,
            SyncSummary {
                added: 1,
                updated: 0,
                removed: 1,
                skipped: 0
            }
        );
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].name, "new");
        assert_eq!(feeds[0].organization, "Iowa DOT");
    }

    #[test]
    fn keyed_feed_gets_the_key_spliced_in() {
        let mut feeds = Vec::new();
        let rows = vec![row("keyed", "https://x.test/feed?key=XXX", true)];
        let keys = HashMap::from([("keyed".to_string(), "SECRET".to_string())]);
        sync_feeds(&rows, &mut feeds, &keys);
        assert_eq!(feeds[0].url.as_deref(), Some("https://x.test/feed?key=SECRET"));
        assert_eq!(feeds[0].api_key.as_deref(), Some("SECRET"));
    }

    #[test]
    fn missing_key_keeps_the_known_entry() {
        let known = Feed {
            name: "keyed".into(),
            state: String::new(),
            organization: String::new(),
            url: Some("https://x.test/feed?key=OLD".into()),
            version: "4.1".into(),
            active: true,
            api_key: Some("OLD".into()),
            verify_tls: false,
        };
        let mut feeds = vec![known.clone()];
        let rows = vec![row("keyed", "https://x.test/feed?key=XXX", true)];
        let summary = sync_feeds(&rows, &mut feeds, &HashMap::new());

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.removed, 0);
        assert_eq!(feeds, vec![known]);
    }

    #[test]
    fn nameless_rows_are_skipped() {
        let mut feeds = Vec::new();
        let rows = vec![DataHubRow {
            feedname: None,
            state: None,
            issuingorganization: None,
            url: None,
            version: None,
            active: None,
            needapikey: false,
        }];
        let summary = sync_feeds(&rows, &mut feeds, &HashMap::new());
        assert_eq!(summary.skipped, 1);
        assert!(feeds.is_empty());
    }

    #[test]
    fn rows_parse_from_datahub_shape() {
        let raw = r#"[{
            "state": "Iowa",
            "issuingorganization": "Iowa DOT",
            "feedname": "iowa_dot",
            "url": {"url": "https://data.iowadot.gov/wzdx.json"},
            "format": "json",
            "active": true,
            "version": "4.2",
            "needapikey": false,
            "pipedtosandbox": true
        }]"#;
        let rows: Vec<DataHubRow> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows[0].feedname.as_deref(), Some("iowa_dot"));
        assert_eq!(
            rows[0].url.as_ref().map(|u| u.url.as_str()),
            Some("https://data.iowadot.gov/wzdx.json")
        );
    }
}
