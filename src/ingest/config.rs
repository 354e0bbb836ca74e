// src/ingest/config.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::ingest::fetcher::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::ingest::types::Feed;

const ENV_PATH: &str = "MONITOR_CONFIG_PATH";

/// Monitor settings plus an optional static feed list for deployments that
/// do not sync against DataHub.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between check runs.
    pub interval_secs: u64,
    /// Per-feed fetch timeout.
    pub request_timeout_secs: u64,
    /// DataHub registry listing URL; when unset, the feed list is static.
    pub datahub_url: Option<String>,
    /// Feed name → API key, spliced into keyed feed URLs during sync.
    pub api_keys: HashMap<String, String>,
    pub feeds: Vec<Feed>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            request_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            datahub_url: None,
            api_keys: HashMap::new(),
            feeds: Vec::new(),
        }
    }
}

/// Load configuration from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load configuration using env var + fallbacks:
/// 1) $MONITOR_CONFIG_PATH
/// 2) config/monitor.toml
/// 3) config/monitor.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<MonitorConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("MONITOR_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/monitor.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/monitor.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(MonitorConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing JSON config");
    }
    if hint_ext == "toml" {
        return toml::from_str(s).context("parsing TOML config");
    }
    // No hint: try TOML first, then JSON.
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    serde_json::from_str(s).map_err(|_| anyhow!("unsupported config format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_parse_to_the_same_config() {
        let toml = r#"
            interval_secs = 600
            datahub_url = "https://data.transportation.gov/resource/69qe-yiui.json"

            [api_keys]
            keyed_feed = "SECRET"

            [[feeds]]
            name = "iowa_dot"
            url = "https://data.iowadot.gov/wzdx.json"
            version = "4.2"
        "#;
        let json = r#"{
            "interval_secs": 600,
            "datahub_url": "https://data.transportation.gov/resource/69qe-yiui.json",
            "api_keys": {"keyed_feed": "SECRET"},
            "feeds": [
                {"name": "iowa_dot", "url": "https://data.iowadot.gov/wzdx.json", "version": "4.2"}
            ]
        }"#;

        let from_toml = parse_config(toml, "toml").unwrap();
        let from_json = parse_config(json, "json").unwrap();

        assert_eq!(from_toml.interval_secs, 600);
        assert_eq!(from_toml.feeds, from_json.feeds);
        assert_eq!(from_toml.api_keys.get("keyed_feed"), Some(&"SECRET".to_string()));
        // unset fields come from defaults
        assert_eq!(from_toml.request_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
    }

    #[test]
    fn unhinted_content_is_sniffed() {
        let cfg = parse_config("interval_secs = 120", "").unwrap();
        assert_eq!(cfg.interval_secs, 120);
        let cfg = parse_config(r#"{"interval_secs": 120}"#, "").unwrap();
        assert_eq!(cfg.interval_secs, 120);
        assert!(parse_config("not a config <>", "").is_err());
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.interval_secs, 3600);
        assert!(cfg.datahub_url.is_none());
        assert!(cfg.feeds.is_empty());
    }
}
