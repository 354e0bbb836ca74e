// tests/status_dates.rs
// Date-based verdicts over schema-valid payloads: outdated and stale only
// apply once the schema gate has passed.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use wzdx_feed_monitor::classify::classify;
use wzdx_feed_monitor::schema::SchemaRegistry;
use wzdx_feed_monitor::status::{FetchResult, Status};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn good_payload() -> Value {
    serde_json::from_str(include_str!("fixtures/wzdx42_good.json")).unwrap()
}

#[test]
fn fresh_feed_is_ok() {
    let registry = SchemaRegistry::bundled();
    let fetch = FetchResult::ok(200, good_payload());
    let status = classify(&registry, "f", "4.2", &fetch, fixed_now()).unwrap();
    assert_eq!(status, Status::Ok);
}

#[test]
fn feed_with_only_old_update_dates_is_outdated() {
    let mut payload = good_payload();
    // the only reachable update_date is the feed-level one; ages in arrays
    // are invisible to the key search
    payload["feed_info"]["update_date"] = json!("2025-05-01T06:00:00Z");

    let registry = SchemaRegistry::bundled();
    let status = classify(
        &registry,
        "f",
        "4.2",
        &FetchResult::ok(200, payload),
        fixed_now(),
    )
    .unwrap();
    assert_eq!(
        status,
        Status::Outdated {
            latest_update_date: Utc.with_ymd_and_hms(2025, 5, 1, 6, 0, 0).unwrap()
        }
    );
}

#[test]
fn reachable_old_end_dates_make_a_current_feed_stale() {
    let mut payload = good_payload();
    // publisher extensions are allowed; an object-valued one exposes its
    // end_date to the recursive key search
    payload
        .as_object_mut()
        .unwrap()
        .insert(
            "closure_summary".to_string(),
            json!({"end_date": "2025-04-20T00:00:00Z"}),
        );

    let registry = SchemaRegistry::bundled();
    let status = classify(
        &registry,
        "f",
        "4.2",
        &FetchResult::ok(200, payload),
        fixed_now(),
    )
    .unwrap();
    assert_eq!(
        status,
        Status::Stale {
            latest_end_date: Utc.with_ymd_and_hms(2025, 4, 20, 0, 0, 0).unwrap(),
            count_before_cutoff: 1,
        }
    );
}

#[test]
fn outdated_takes_precedence_over_stale() {
    let mut payload = good_payload();
    payload["feed_info"]["update_date"] = json!("2025-05-01T06:00:00Z");
    payload
        .as_object_mut()
        .unwrap()
        .insert(
            "closure_summary".to_string(),
            json!({"end_date": "2025-04-20T00:00:00Z"}),
        );

    let registry = SchemaRegistry::bundled();
    let status = classify(
        &registry,
        "f",
        "4.2",
        &FetchResult::ok(200, payload),
        fixed_now(),
    )
    .unwrap();
    assert!(matches!(status, Status::Outdated { .. }), "{status:?}");
}
