//! Field trust ledger writer
//!
//! Every truthy enriched field gets an `enrichment` provenance row. Fields the
//! run did not produce keep whatever row they had.

use std::sync::Arc;

use stak_common::Result;
use tracing::debug;

use crate::db::EnrichmentStore;
use crate::models::MetadataUpsert;
use crate::types::{EnrichedProfileData, EnrichmentSources, Provenance};

pub struct MetadataUpdater {
    store: Arc<dyn EnrichmentStore>,
    confidence: f32,
}

impl MetadataUpdater {
    /// `confidence` is stamped on every row this updater writes
    pub fn new(store: Arc<dyn EnrichmentStore>, confidence: f32) -> Self {
        Self { store, confidence }
    }

    /// Upsert metadata for each truthy field, returning the fields written
    pub async fn update_metadata(
        &self,
        user_id: &str,
        enriched: &EnrichedProfileData,
        sources: &EnrichmentSources,
    ) -> Result<Vec<String>> {
        let source_values = sources.flatten();
        let mut written = Vec::new();

        for (field, value) in enriched.iter() {
            if !value.is_truthy() {
                continue;
            }

            self.store
                .upsert_profile_metadata(&MetadataUpsert {
                    user_id: user_id.to_string(),
                    field_name: field.as_str().to_string(),
                    provenance: Provenance::Enrichment,
                    confidence: self.confidence,
                    sources: source_values.clone(),
                })
                .await?;

            debug!(user_id, field = %field, "Updated field metadata");
            written.push(field.as_str().to_string());
        }

        Ok(written)
    }
}
