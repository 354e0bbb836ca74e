//! Versioned JSON Schema registry.
//!
//! Seven schema documents ship with the crate (WZDx 2.0 through 4.2 plus the
//! ITE CWZ 1.0 variant) and are preloaded into an in-memory cache keyed by
//! canonical URI. Feeds reference schemas by version string; `$ref`s inside
//! the documents resolve through the same cache. A reference to a URI the
//! bundle does not cover is fetched over the network once and cached for the
//! rest of the process lifetime.

pub mod validate;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::info;

use crate::error::SchemaError;

/// Declared feed version → canonical schema URI.
pub const VERSION_TO_SCHEMA: &[(&str, &str)] = &[
    (
        "4.2",
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/4.2/WorkZoneFeed.json",
    ),
    (
        "4.1",
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/4.1/WorkZoneFeed.json",
    ),
    (
        "4.0",
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/4.0/WZDxFeed.json",
    ),
    (
        "3.1",
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/3.1/WZDxFeed.json",
    ),
    (
        "3.0",
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/3.0/WZDxFeed.json",
    ),
    (
        "2.0",
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/2.0/WZDxFeed.json",
    ),
    (
        "CWZ 1.0",
        "https://raw.githubusercontent.com/ite-org/cwz/refs/heads/main/schemas/1.0/WorkZoneFeed.json",
    ),
];

const BUNDLED: &[(&str, &str)] = &[
    (
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/4.2/WorkZoneFeed.json",
        include_str!("../../schemas/wzdx42.schema.json"),
    ),
    (
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/4.1/WorkZoneFeed.json",
        include_str!("../../schemas/wzdx41.schema.json"),
    ),
    (
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/4.0/WZDxFeed.json",
        include_str!("../../schemas/wzdx40.schema.json"),
    ),
    (
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/3.1/WZDxFeed.json",
        include_str!("../../schemas/wzdx31.schema.json"),
    ),
    (
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/3.0/WZDxFeed.json",
        include_str!("../../schemas/wzdx30.schema.json"),
    ),
    (
        "https://raw.githubusercontent.com/usdot-jpo-ode/wzdx/main/schemas/2.0/WZDxFeed.json",
        include_str!("../../schemas/wzdx20.schema.json"),
    ),
    (
        "https://raw.githubusercontent.com/ite-org/cwz/refs/heads/main/schemas/1.0/WorkZoneFeed.json",
        include_str!("../../schemas/cwz10.schema.json"),
    ),
];

const FALLBACK_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-wide, read-mostly schema cache. Entries are added, never removed
/// or replaced.
#[derive(Debug)]
pub struct SchemaRegistry {
    cache: RwLock<HashMap<String, Arc<Value>>>,
    // serializes the fallback path so concurrent first access to the same
    // uncached URI fetches once
    fetch_lock: Mutex<()>,
}

impl SchemaRegistry {
    /// Registry preloaded with the bundled schema documents.
    pub fn bundled() -> Self {
        let mut cache = HashMap::with_capacity(BUNDLED.len());
        for (uri, raw) in BUNDLED {
            let doc: Value =
                serde_json::from_str(raw).expect("bundled schema documents are valid JSON");
            cache.insert((*uri).to_string(), Arc::new(doc));
        }
        Self {
            cache: RwLock::new(cache),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Empty registry, for tests that register their own documents.
    pub fn empty() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Register a document under a canonical URI. Existing entries win.
    pub fn insert(&self, uri: impl Into<String>, doc: Value) {
        let mut cache = self.cache.write().expect("schema cache lock poisoned");
        cache.entry(uri.into()).or_insert_with(|| Arc::new(doc));
    }

    /// The `{"$ref": uri}` wrapper schema for a declared feed version.
    pub fn schema_ref_for_version(&self, version: &str) -> Result<Value, SchemaError> {
        let uri = VERSION_TO_SCHEMA
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, uri)| *uri)
            .ok_or_else(|| SchemaError::UnknownVersion(version.to_string()))?;
        Ok(json!({ "$ref": uri }))
    }

    /// Look up a schema document by URI, fetching and caching it on a miss.
    ///
    /// The miss path blocks on the network; callers inside an async runtime
    /// run classification under `spawn_blocking`.
    pub fn resolve(&self, uri: &str) -> Result<Arc<Value>, SchemaError> {
        if let Some(doc) = self
            .cache
            .read()
            .expect("schema cache lock poisoned")
            .get(uri)
        {
            return Ok(Arc::clone(doc));
        }

        let _guard = self.fetch_lock.lock().expect("schema fetch lock poisoned");
        // another thread may have fetched while we waited
        if let Some(doc) = self
            .cache
            .read()
            .expect("schema cache lock poisoned")
            .get(uri)
        {
            return Ok(Arc::clone(doc));
        }

        let doc = Arc::new(retrieve_via_web(uri)?);
        self.cache
            .write()
            .expect("schema cache lock poisoned")
            .insert(uri.to_string(), Arc::clone(&doc));
        Ok(doc)
    }
}

fn retrieve_via_web(uri: &str) -> Result<Value, SchemaError> {
    info!(uri, "requesting uncached schema document");
    let client = reqwest::blocking::Client::builder()
        .timeout(FALLBACK_FETCH_TIMEOUT)
        .build()
        .map_err(|e| SchemaError::Unavailable {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
    let response = client
        .get(uri)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| SchemaError::Unavailable {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
    response.json().map_err(|e| SchemaError::InvalidDocument {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}
