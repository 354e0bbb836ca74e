//! Status history: "active since" carry-forward and an in-memory,
//! append-only per-feed log.
//!
//! The carry-forward policy lives in `merge` as a pure two-argument
//! function so it stays testable on its own; `StatusLog` applies it at
//! record time and stands in for the persistence collaborator.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::status::StatusVerdict;

/// Carry `active_since` forward when the status kind is unchanged from the
/// previous verdict; otherwise the new status became active at this check.
pub fn merge(previous: Option<&StatusVerdict>, mut current: StatusVerdict) -> StatusVerdict {
    match previous {
        Some(prev) if prev.kind() == current.kind() => {
            current.active_since = prev.active_since;
        }
        _ => {
            current.active_since = current.checked_at;
        }
    }
    current
}

/// Append-only verdict store keyed by feed name, capped per feed. Concurrent
/// recorders for *different* feeds are fine; the classification run itself
/// is sequential so no feed is ever recorded twice at once.
#[derive(Debug)]
pub struct StatusLog {
    inner: Mutex<HashMap<String, Vec<StatusVerdict>>>,
    cap: usize,
}

impl StatusLog {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            cap: cap.clamp(1, 10_000),
        }
    }

    /// Merge against the feed's latest verdict and append the result.
    /// Returns the stored (merged) verdict.
    pub fn record(&self, feed: &str, verdict: StatusVerdict) -> StatusVerdict {
        let mut map = self.inner.lock().expect("status log mutex poisoned");
        let entries = map.entry(feed.to_string()).or_default();
        let merged = merge(entries.last(), verdict);
        entries.push(merged.clone());
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(0..excess);
        }
        merged
    }

    /// Latest verdict for a feed, if it has ever been checked.
    pub fn latest(&self, feed: &str) -> Option<StatusVerdict> {
        let map = self.inner.lock().expect("status log mutex poisoned");
        map.get(feed).and_then(|v| v.last().cloned())
    }

    /// Full recorded history for a feed, oldest first.
    pub fn snapshot(&self, feed: &str) -> Vec<StatusVerdict> {
        let map = self.inner.lock().expect("status log mutex poisoned");
        map.get(feed).cloned().unwrap_or_default()
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::with_capacity(1_000)
    }
}
