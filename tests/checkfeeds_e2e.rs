// tests/checkfeeds_e2e.rs
// Full check run over a mix of healthy, broken, and skipped feeds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use wzdx_feed_monitor::history::StatusLog;
use wzdx_feed_monitor::ingest::types::{Feed, FeedFetcher};
use wzdx_feed_monitor::ingest::{run_once, RunSummary};
use wzdx_feed_monitor::schema::SchemaRegistry;
use wzdx_feed_monitor::status::{FetchResult, Status, StatusKind};

struct MockFetcher {
    results: HashMap<String, FetchResult>,
}

#[async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, feed: &Feed) -> FetchResult {
        self.results
            .get(&feed.name)
            .cloned()
            .unwrap_or_else(FetchResult::failed)
    }
    fn name(&self) -> &'static str {
        "MockFetcher"
    }
}

fn feed(name: &str, version: &str, active: bool) -> Feed {
    Feed {
        name: name.to_string(),
        state: "IA".to_string(),
        organization: "Iowa DOT".to_string(),
        url: Some(format!("https://example.test/{name}.json")),
        version: version.to_string(),
        active,
        api_key: None,
        verify_tls: true,
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn good_payload() -> Value {
    serde_json::from_str(include_str!("fixtures/wzdx42_good.json")).unwrap()
}

fn bad_payload() -> Value {
    serde_json::from_str(include_str!("fixtures/wzdx42_bad.json")).unwrap()
}

#[tokio::test]
async fn run_classifies_every_fetchable_feed_exactly_once() {
    let feeds = vec![
        feed("healthy", "4.2", true),
        feed("broken", "4.2", true),
        feed("down", "4.2", true),
        feed("empty", "4.2", true),
        feed("paused", "4.2", false),
        feed("odd_version", "9.9", true),
    ];
    let results = HashMap::from([
        ("healthy".to_string(), FetchResult::ok(200, good_payload())),
        ("broken".to_string(), FetchResult::ok(200, bad_payload())),
        ("down".to_string(), FetchResult::failed()),
        ("empty".to_string(), FetchResult::ok(200, json!({}))),
        ("odd_version".to_string(), FetchResult::ok(200, good_payload())),
    ]);
    let fetcher = MockFetcher { results };
    let registry = Arc::new(SchemaRegistry::bundled());
    let log = Arc::new(StatusLog::default());

    let summary = run_once(&feeds, &fetcher, &registry, &log, fixed_now()).await;

    assert_eq!(
        summary,
        RunSummary {
            checked: 4,
            skipped: 1,
            failed: 1
        }
    );

    assert_eq!(log.latest("healthy").unwrap().status, Status::Ok);
    assert_eq!(log.latest("down").unwrap().status, Status::Offline);
    // empty object payload counts as offline even with HTTP 200
    assert_eq!(log.latest("empty").unwrap().status, Status::Offline);
    assert_eq!(
        log.latest("broken").unwrap().kind(),
        StatusKind::SchemaError
    );
    // skipped and failed feeds never get a verdict
    assert!(log.latest("paused").is_none());
    assert!(log.latest("odd_version").is_none());
    // exactly one verdict per checked feed per run
    assert_eq!(log.snapshot("healthy").len(), 1);
}

#[tokio::test]
async fn schema_error_detail_reports_the_most_common_violation() {
    let feeds = vec![feed("broken", "4.2", true)];
    let fetcher = MockFetcher {
        results: HashMap::from([("broken".to_string(), FetchResult::ok(200, bad_payload()))]),
    };
    let registry = Arc::new(SchemaRegistry::bundled());
    let log = Arc::new(StatusLog::default());

    run_once(&feeds, &fetcher, &registry, &log, fixed_now()).await;

    match log.latest("broken").unwrap().status {
        Status::SchemaError {
            most_common_count,
            total_errors,
            ref most_common_field,
            ..
        } => {
            // the fixture carries two independent violations
            assert_eq!(total_errors, 2);
            assert_eq!(most_common_count, 1);
            assert!(most_common_field.starts_with("broken["));
        }
        ref other => panic!("expected schema error, got {other:?}"),
    }
}

#[tokio::test]
async fn one_feeds_failure_never_stops_the_run() {
    // the failing feed comes first; the healthy one must still be checked
    let feeds = vec![feed("odd_version", "9.9", true), feed("healthy", "4.2", true)];
    let fetcher = MockFetcher {
        results: HashMap::from([
            ("odd_version".to_string(), FetchResult::ok(200, good_payload())),
            ("healthy".to_string(), FetchResult::ok(200, good_payload())),
        ]),
    };
    let registry = Arc::new(SchemaRegistry::bundled());
    let log = Arc::new(StatusLog::default());

    let summary = run_once(&feeds, &fetcher, &registry, &log, fixed_now()).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.checked, 1);
    assert_eq!(log.latest("healthy").unwrap().status, Status::Ok);
}
