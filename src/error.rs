//! Error taxonomy for schema resolution and validation setup.
//!
//! Validation *results* are data (`schema::validate::ValidationError` lists),
//! never errors. These variants cover the cases where a verdict cannot be
//! produced at all; the ingest driver reports them and moves on to the next
//! feed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// The feed declares a version with no entry in the version table.
    #[error("no schema registered for feed version `{0}`")]
    UnknownVersion(String),

    /// A schema URI could not be retrieved on the registry's fallback path.
    #[error("schema `{uri}` could not be retrieved: {reason}")]
    Unavailable { uri: String, reason: String },

    /// A schema document exists but cannot be used (bad JSON, missing
    /// fragment target, or a `pattern` the regex engine rejects).
    #[error("schema document `{uri}` is unusable: {reason}")]
    InvalidDocument { uri: String, reason: String },
}
