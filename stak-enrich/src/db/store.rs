//! Persistence seam for the enrichment pipeline
//!
//! The orchestrator and its stages talk to storage only through
//! [`EnrichmentStore`], so tests can inject failures at any write.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use stak_common::Result;

use crate::models::{MetadataUpsert, NewEnrichmentLog, NewLlmUsage, NewProfileEnrichment, Profile};

/// Storage operations the pipeline needs
#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Append one ProfileEnrichment row
    async fn insert_profile_enrichment(&self, record: &NewProfileEnrichment) -> Result<String>;

    async fn insert_enrichment_log(&self, log: &NewEnrichmentLog) -> Result<String>;

    /// Keyed on (user_id, field_name)
    async fn upsert_profile_metadata(&self, upsert: &MetadataUpsert) -> Result<()>;

    async fn load_trust_signals(&self, user_id: &str) -> Result<Option<Value>>;

    /// Replace the whole trust-signal document for a user
    async fn upsert_trust_signals(&self, user_id: &str, signals: &Value) -> Result<()>;

    async fn record_llm_usage(&self, usage: &NewLlmUsage) -> Result<()>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteEnrichmentStore {
    pool: SqlitePool,
}

impl SqliteEnrichmentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrichmentStore for SqliteEnrichmentStore {
    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        super::profiles::load_profile(&self.pool, user_id).await
    }

    async fn insert_profile_enrichment(&self, record: &NewProfileEnrichment) -> Result<String> {
        super::enrichments::insert_profile_enrichment(&self.pool, record).await
    }

    async fn insert_enrichment_log(&self, log: &NewEnrichmentLog) -> Result<String> {
        super::enrichment_logs::insert_enrichment_log(&self.pool, log).await
    }

    async fn upsert_profile_metadata(&self, upsert: &MetadataUpsert) -> Result<()> {
        super::metadata::upsert_profile_metadata(&self.pool, upsert).await
    }

    async fn load_trust_signals(&self, user_id: &str) -> Result<Option<Value>> {
        super::trust_signals::load_trust_signals(&self.pool, user_id).await
    }

    async fn upsert_trust_signals(&self, user_id: &str, signals: &Value) -> Result<()> {
        super::trust_signals::upsert_trust_signals(&self.pool, user_id, signals).await
    }

    async fn record_llm_usage(&self, usage: &NewLlmUsage) -> Result<()> {
        super::usage::record_llm_usage(&self.pool, usage).await
    }
}
