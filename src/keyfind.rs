//! Recursive key finder over JSON documents, plus the locator formatting
//! used in validation reports.
//!
//! The traversal only descends into object-valued fields. Arrays are never
//! entered, so keys inside array elements are invisible to the search.
//! Cycles cannot occur: `serde_json::Value` is an owned tree with no shared
//! references.

use std::fmt;

use serde_json::Value;

/// Collect every value stored under `key` anywhere in `obj`, depth-first,
/// parent before children, siblings in document order. A child branch whose
/// own key equals `skip_key` is not entered (the value under `key` itself is
/// still collected at the node where it appears).
pub fn find_all_instances_key<'a>(
    obj: &'a Value,
    key: &str,
    skip_key: Option<&str>,
) -> Vec<&'a Value> {
    let mut out = Vec::new();
    collect(obj, key, skip_key, &mut out);
    out
}

fn collect<'a>(value: &'a Value, key: &str, skip_key: Option<&str>, out: &mut Vec<&'a Value>) {
    let Some(map) = value.as_object() else {
        return;
    };
    if let Some(v) = map.get(key) {
        out.push(v);
    }
    for (k, v) in map {
        if skip_key.is_some_and(|s| k == s) {
            continue;
        }
        if v.is_object() {
            collect(v, key, skip_key, out);
        }
    }
}

/// One step of a JSON location: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "'{k}'"),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Render a locator as `container['a'][0]['b']`; with no indices the
/// container comes back unchanged.
pub fn format_as_index(container: &str, indices: &[PathSegment]) -> String {
    if indices.is_empty() {
        return container.to_string();
    }
    let joined = indices
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("][");
    format!("{container}[{joined}]")
}
