//! Database access for stak-enrich
//!
//! Free async functions per table. [`store::SqliteEnrichmentStore`] wraps the
//! subset the pipeline needs behind the [`store::EnrichmentStore`] trait.

pub mod enrichment_logs;
pub mod enrichments;
pub mod match_scores;
pub mod metadata;
pub mod profiles;
pub mod settings;
pub mod store;
pub mod trust_signals;
pub mod usage;

pub use store::{EnrichmentStore, SqliteEnrichmentStore};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use stak_common::{Error, Result};

/// Parse an RFC 3339 column into UTC
pub(crate) fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

/// Deserialize a JSON text column
pub(crate) fn parse_json<T: DeserializeOwned>(value: &str, column: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}
