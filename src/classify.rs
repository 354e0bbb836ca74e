//! Feed status classification.
//!
//! Pure decision ladder over one fetch outcome, evaluated in strict priority
//! order: Offline, SchemaError, Outdated, Stale, Ok. The first matching rule
//! wins, so no two verdicts can hold at once. `now` is passed in so the
//! 14-day cutoff is computed exactly once per run and the whole function is
//! a pure function of its inputs.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::error::SchemaError;
use crate::keyfind::find_all_instances_key;
use crate::schema::validate::{get_formatted_errors, get_version_schema_errors};
use crate::schema::SchemaRegistry;
use crate::status::{FetchResult, Status};

/// Feeds whose dates all fall more than this many days in the past are
/// flagged outdated/stale.
pub const FRESHNESS_WINDOW_DAYS: i64 = 14;

/// Classify one feed's fetch outcome. Feed-configuration checks (inactive,
/// missing URL) belong to the ingest driver, which skips such feeds before
/// ever fetching; by the time this runs, a fetch was attempted.
///
/// `SchemaError` here means a verdict could not be produced at all (unknown
/// version, unreachable schema); the driver reports it and continues with
/// the next feed.
pub fn classify(
    registry: &SchemaRegistry,
    feed_name: &str,
    version: &str,
    fetch: &FetchResult,
    now: DateTime<Utc>,
) -> Result<Status, SchemaError> {
    if is_offline(fetch) {
        return Ok(Status::Offline);
    }

    let errors = get_version_schema_errors(registry, &fetch.payload, version)?;
    if !errors.is_empty() {
        let formatted = get_formatted_errors(&errors, feed_name);
        return Ok(schema_error_status(&formatted, errors.len()));
    }

    let cutoff = now - Duration::days(FRESHNESS_WINDOW_DAYS);

    if let Some(latest_update_date) = outdated(&fetch.payload, cutoff) {
        return Ok(Status::Outdated { latest_update_date });
    }

    if let Some((latest_end_date, count_before_cutoff)) = stale(&fetch.payload, cutoff) {
        return Ok(Status::Stale {
            latest_end_date,
            count_before_cutoff,
        });
    }

    Ok(Status::Ok)
}

/// Offline when the fetch itself failed, the response was not 200, or the
/// decoded payload is empty/falsy.
fn is_offline(fetch: &FetchResult) -> bool {
    !fetch.succeeded || fetch.http_status != 200 || payload_is_falsy(&fetch.payload)
}

// Python truthiness over JSON values: null, false, 0, "", [], {} are falsy.
fn payload_is_falsy(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Group formatted errors by message alone; the most frequent message is the
/// error type, its first occurrence supplies the representative field.
/// First-encountered wins ties. `total_errors` counts raw violations, which
/// can exceed the formatted count when reporting drops a violation.
fn schema_error_status(formatted: &[(String, String)], total_errors: usize) -> Status {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (message, _) in formatted {
        match counts.iter_mut().find(|(m, _)| *m == message.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((message, 1)),
        }
    }

    let Some((most_common_type, most_common_count)) = counts
        .iter()
        .fold(None::<(&str, usize)>, |best, &(m, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((m, n)),
        })
    else {
        // reporting dropped every violation; keep the raw total so the
        // verdict still says something went wrong
        return Status::SchemaError {
            most_common_type: String::new(),
            most_common_field: String::new(),
            most_common_count: 0,
            total_errors,
        };
    };

    let most_common_field = formatted
        .iter()
        .find(|(m, _)| m.as_str() == most_common_type)
        .map(|(_, field)| field.clone())
        .unwrap_or_default();

    Status::SchemaError {
        most_common_type: most_common_type.to_string(),
        most_common_field,
        most_common_count,
        total_errors,
    }
}

/// Outdated when at least one `update_date` exists and every one of them is
/// strictly older than the cutoff. Returns the most recent of those dates.
fn outdated(payload: &Value, cutoff: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let update_dates = collect_dates(payload, "update_date");
    if update_dates.is_empty() {
        return None;
    }
    if update_dates.iter().all(|d| *d < cutoff) {
        update_dates.into_iter().max()
    } else {
        None
    }
}

/// Stale when any `end_date` is strictly older than the cutoff. Returns the
/// most recent of the old end dates and how many there are; end dates within
/// the window are ignored entirely.
fn stale(payload: &Value, cutoff: DateTime<Utc>) -> Option<(DateTime<Utc>, usize)> {
    let old: Vec<DateTime<Utc>> = collect_dates(payload, "end_date")
        .into_iter()
        .filter(|d| *d < cutoff)
        .collect();
    let latest = old.iter().max().copied()?;
    Some((latest, old.len()))
}

// By this point the payload validated against its schema, so the date values
// should all parse; anything that does not is skipped rather than failing
// the run.
fn collect_dates(payload: &Value, key: &str) -> Vec<DateTime<Utc>> {
    find_all_instances_key(payload, key, None)
        .into_iter()
        .filter_map(Value::as_str)
        .filter_map(parse_timestamp)
        .collect()
}

/// ISO-8601 parsing; timezone-naive inputs are assumed UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    None
}
