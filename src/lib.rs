// src/lib.rs
// Public library surface for the batch binary and integration tests.

pub mod classify;
pub mod error;
pub mod history;
pub mod keyfind;
pub mod schema;
pub mod status;

// Feed fetching, DataHub sync, and the periodic check driver
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::classify::classify;
pub use crate::error::SchemaError;
pub use crate::history::{merge, StatusLog};
pub use crate::keyfind::{find_all_instances_key, format_as_index};
pub use crate::schema::SchemaRegistry;
pub use crate::status::{FetchResult, Status, StatusKind, StatusVerdict};
