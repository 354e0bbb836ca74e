//! Status verdict types produced by one classification run.
//!
//! A feed gets exactly one `StatusVerdict` per run. The five status kinds are
//! mutually exclusive by construction: the classifier evaluates its rules in
//! strict priority order and the first match wins. A verdict is immutable
//! once history-merged; only the `notified` flag is flipped later by the
//! notification collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind-specific payload of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    /// Fetch failed, non-200 response, or empty/falsy payload.
    Offline,
    /// Payload does not validate against the declared version's schema.
    SchemaError {
        /// Most frequent error message across all formatted errors.
        most_common_type: String,
        /// Locator of the first occurrence of the most frequent message.
        most_common_field: String,
        most_common_count: usize,
        total_errors: usize,
    },
    /// Every `update_date` in the payload is older than the cutoff.
    Outdated { latest_update_date: DateTime<Utc> },
    /// Some events ended before the cutoff and are still being published.
    Stale {
        latest_end_date: DateTime<Utc>,
        count_before_cutoff: usize,
    },
    Ok,
}

/// Two-letter discriminant, stored alongside each verdict. The codes match
/// the dashboard's persisted status-type column (`NA` is the null
/// placeholder for feeds that have never been checked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    #[serde(rename = "NA")]
    Null,
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ER")]
    SchemaError,
    #[serde(rename = "OU")]
    Outdated,
    #[serde(rename = "ST")]
    Stale,
    #[serde(rename = "OF")]
    Offline,
}

impl StatusKind {
    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Null => "null",
            StatusKind::Ok => "ok",
            StatusKind::SchemaError => "error",
            StatusKind::Outdated => "outdated",
            StatusKind::Stale => "stale",
            StatusKind::Offline => "offline",
        }
    }
}

impl Status {
    pub fn kind(&self) -> StatusKind {
        match self {
            Status::Offline => StatusKind::Offline,
            Status::SchemaError { .. } => StatusKind::SchemaError,
            Status::Outdated { .. } => StatusKind::Outdated,
            Status::Stale { .. } => StatusKind::Stale,
            Status::Ok => StatusKind::Ok,
        }
    }
}

/// One classification result for one feed, with run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusVerdict {
    #[serde(flatten)]
    pub status: Status,
    /// When classification ran.
    pub checked_at: DateTime<Utc>,
    /// When the feed entered this status kind. Carried forward across
    /// consecutive same-kind verdicts by `history::merge`.
    pub active_since: DateTime<Utc>,
    /// Set by the notification collaborator after a digest goes out.
    #[serde(default)]
    pub notified: bool,
}

impl StatusVerdict {
    /// A fresh verdict; `active_since` starts at `checked_at` until the
    /// history merge decides otherwise.
    pub fn new(status: Status, checked_at: DateTime<Utc>) -> Self {
        Self {
            status,
            checked_at,
            active_since: checked_at,
            notified: false,
        }
    }

    pub fn kind(&self) -> StatusKind {
        self.status.kind()
    }

    /// Everything except `Ok` counts as an error for alerting purposes.
    pub fn is_error(&self) -> bool {
        self.kind() != StatusKind::Ok
    }

    /// Short human-readable detail line for logs and digests.
    pub fn summary(&self) -> String {
        match &self.status {
            Status::Offline => "feed is offline".to_string(),
            Status::SchemaError {
                most_common_type,
                most_common_field,
                most_common_count,
                total_errors,
            } => format!(
                "{total_errors} schema error{}; most common ({most_common_count}x): {most_common_type} at {most_common_field}",
                if *total_errors == 1 { "" } else { "s" }
            ),
            Status::Outdated { latest_update_date } => {
                format!("last updated {}", latest_update_date.to_rfc3339())
            }
            Status::Stale {
                latest_end_date,
                count_before_cutoff,
            } => format!(
                "{count_before_cutoff} event{} ended before cutoff, latest {}",
                if *count_before_cutoff == 1 { "" } else { "s" },
                latest_end_date.to_rfc3339()
            ),
            Status::Ok => "all good".to_string(),
        }
    }
}

/// Outcome of one HTTP fetch of a feed, as seen by the classifier.
///
/// Transport failures and timeouts never surface as errors; the fetcher maps
/// them into `FetchResult::failed()` and the Offline rule takes over.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub http_status: u16,
    pub payload: Value,
    pub succeeded: bool,
}

impl FetchResult {
    pub fn ok(http_status: u16, payload: Value) -> Self {
        Self {
            http_status,
            payload,
            succeeded: true,
        }
    }

    /// The offline-forcing value for transport errors and timeouts.
    pub fn failed() -> Self {
        Self {
            http_status: 0,
            payload: Value::Null,
            succeeded: false,
        }
    }
}
