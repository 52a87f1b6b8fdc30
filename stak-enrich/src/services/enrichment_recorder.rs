//! Append-only enrichment history writer

use std::sync::Arc;

use serde_json::json;
use stak_common::Result;
use tracing::debug;

use crate::db::EnrichmentStore;
use crate::models::NewProfileEnrichment;
use crate::types::{EnrichedProfileData, EnrichmentSources, EnrichmentStatus, TriggerType};

/// Writes ProfileEnrichment rows
pub struct EnrichmentRecorder {
    store: Arc<dyn EnrichmentStore>,
}

impl EnrichmentRecorder {
    pub fn new(store: Arc<dyn EnrichmentStore>) -> Self {
        Self { store }
    }

    /// Record a completed attempt
    pub async fn record(
        &self,
        user_id: &str,
        enriched: &EnrichedProfileData,
        sources: &EnrichmentSources,
        enrichment_type: TriggerType,
    ) -> Result<String> {
        let id = self
            .store
            .insert_profile_enrichment(&NewProfileEnrichment {
                user_id: user_id.to_string(),
                payload: serde_json::to_value(enriched)?,
                sources: sources.clone(),
                enrichment_type,
                status: EnrichmentStatus::Completed,
            })
            .await?;

        debug!(user_id, enrichment_id = %id, fields = enriched.len(), "Recorded enrichment");
        Ok(id)
    }

    /// Record a failed attempt with `{error: message}` as payload
    pub async fn record_failure(
        &self,
        user_id: &str,
        sources: &EnrichmentSources,
        enrichment_type: TriggerType,
        message: &str,
    ) -> Result<String> {
        self.store
            .insert_profile_enrichment(&NewProfileEnrichment {
                user_id: user_id.to_string(),
                payload: json!({ "error": message }),
                sources: sources.clone(),
                enrichment_type,
                status: EnrichmentStatus::Failed,
            })
            .await
    }
}
