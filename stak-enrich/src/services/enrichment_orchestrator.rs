//! Enrichment orchestration
//!
//! One run: load profile → consent gate → gather sources → build context →
//! normalize → {record, metadata, trust signals} → final log.
//!
//! Only a missing or unloadable profile surfaces as `Err`. Every other failure
//! becomes a structured `EnrichmentOutcome` with a failed record pair written
//! on a best-effort basis.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::EnrichmentSettings;
use crate::db::EnrichmentStore;
use crate::models::{NewEnrichmentLog, Profile};
use crate::services::context_builder::build_search_context;
use crate::services::enrichment_recorder::EnrichmentRecorder;
use crate::services::field_normalizer::{FieldNormalizer, NormalizationOutcome};
use crate::services::llm_client::TextGenerator;
use crate::services::metadata_updater::MetadataUpdater;
use crate::services::source_gatherer::SourceGatherer;
use crate::services::trust_signal_updater::TrustSignalUpdater;
use crate::types::{EnrichedProfileData, EnrichmentOutcome, EnrichmentSources, LogStatus, TriggerType};

/// `source` column value for pipeline log rows
pub const LOG_SOURCE: &str = "llm_normalizer";

/// Enrichment errors
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("no consent for public-source enrichment")]
    ConsentDenied,

    #[error("Persistence error: {0}")]
    Persistence(#[from] stak_common::Error),
}

/// Pipeline entry point
pub struct EnrichmentOrchestrator {
    store: Arc<dyn EnrichmentStore>,
    gatherer: SourceGatherer,
    normalizer: FieldNormalizer,
    recorder: EnrichmentRecorder,
    metadata: MetadataUpdater,
    trust_signals: TrustSignalUpdater,
}

/// What a successful pipeline pass produced, for the final log row
struct PipelineResult {
    enriched: EnrichedProfileData,
    confidence: f32,
    degraded: Option<String>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        store: Arc<dyn EnrichmentStore>,
        generator: Arc<dyn TextGenerator>,
        settings: &EnrichmentSettings,
    ) -> Self {
        Self {
            gatherer: SourceGatherer::new(settings.consumer_domains.clone()),
            normalizer: FieldNormalizer::new(
                generator,
                Arc::clone(&store),
                settings.min_field_confidence,
            ),
            recorder: EnrichmentRecorder::new(Arc::clone(&store)),
            metadata: MetadataUpdater::new(Arc::clone(&store), settings.metadata_confidence),
            trust_signals: TrustSignalUpdater::new(Arc::clone(&store)),
            store,
        }
    }

    /// Run one enrichment pass for `user_id`
    pub async fn enrich_profile(
        &self,
        user_id: &str,
        trigger: TriggerType,
    ) -> Result<EnrichmentOutcome, EnrichmentError> {
        let started = Instant::now();

        let profile = self
            .store
            .load_profile(user_id)
            .await?
            .ok_or_else(|| EnrichmentError::NotFound(user_id.to_string()))?;

        info!(user_id, trigger = %trigger, "Starting profile enrichment");

        if trigger.requires_consent() && !profile.has_public_enrichment_consent() {
            let message = EnrichmentError::ConsentDenied.to_string();
            warn!(user_id, trigger = %trigger, "Enrichment refused: {}", message);
            self.write_log_best_effort(NewEnrichmentLog {
                user_id: user_id.to_string(),
                source: LOG_SOURCE.to_string(),
                extracted_fields: Vec::new(),
                match_confidence: 0,
                status: LogStatus::Failed,
                enrichment_type: trigger,
                error_message: Some(message.clone()),
                processing_time_ms: elapsed_ms(started),
            })
            .await;
            return Ok(EnrichmentOutcome::failed(message));
        }

        let sources = self.gatherer.gather_deterministic_sources(&profile);

        match self.run_pipeline(&profile, &sources, trigger).await {
            Ok(result) => {
                let status = if result.enriched.is_empty() {
                    LogStatus::Partial
                } else {
                    LogStatus::Success
                };
                let elapsed = elapsed_ms(started);

                self.write_log_best_effort(NewEnrichmentLog {
                    user_id: user_id.to_string(),
                    source: LOG_SOURCE.to_string(),
                    extracted_fields: result.enriched.field_names(),
                    match_confidence: to_percent(result.confidence),
                    status,
                    enrichment_type: trigger,
                    error_message: result.degraded,
                    processing_time_ms: elapsed,
                })
                .await;

                info!(
                    user_id,
                    trigger = %trigger,
                    fields = result.enriched.len(),
                    status = status.as_str(),
                    elapsed_ms = elapsed,
                    "Profile enrichment finished"
                );

                Ok(EnrichmentOutcome::succeeded(result.enriched, sources))
            }
            Err(e) => {
                let message = e.to_string();
                error!(user_id, trigger = %trigger, error = %message, "Profile enrichment failed");

                if let Err(write_err) = self
                    .recorder
                    .record_failure(user_id, &sources, trigger, &message)
                    .await
                {
                    error!(user_id, error = %write_err, "Failed to record failed enrichment");
                }

                self.write_log_best_effort(NewEnrichmentLog {
                    user_id: user_id.to_string(),
                    source: LOG_SOURCE.to_string(),
                    extracted_fields: Vec::new(),
                    match_confidence: 0,
                    status: LogStatus::Failed,
                    enrichment_type: trigger,
                    error_message: Some(message.clone()),
                    processing_time_ms: elapsed_ms(started),
                })
                .await;

                Ok(EnrichmentOutcome::failed(message))
            }
        }
    }

    async fn run_pipeline(
        &self,
        profile: &Profile,
        sources: &EnrichmentSources,
        trigger: TriggerType,
    ) -> stak_common::Result<PipelineResult> {
        let context = build_search_context(profile, sources);

        let (enriched, confidence, degraded) =
            match self.normalizer.normalize(profile, sources, &context).await {
                NormalizationOutcome::Enriched(accepted) => {
                    (accepted.data, accepted.mean_confidence, None)
                }
                NormalizationOutcome::NothingUsable => (EnrichedProfileData::new(), 0.0, None),
                NormalizationOutcome::CallFailed(e) => (
                    EnrichedProfileData::new(),
                    0.0,
                    Some(format!("normalization unavailable: {}", e)),
                ),
            };

        self.recorder
            .record(&profile.id, &enriched, sources, trigger)
            .await?;
        self.metadata
            .update_metadata(&profile.id, &enriched, sources)
            .await?;
        self.trust_signals
            .update_trust_signals(&profile.id, sources)
            .await?;

        Ok(PipelineResult {
            enriched,
            confidence,
            degraded,
        })
    }

    async fn write_log_best_effort(&self, log: NewEnrichmentLog) {
        if let Err(e) = self.store.insert_enrichment_log(&log).await {
            error!(user_id = %log.user_id, error = %e, "Failed to write enrichment log");
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u64::MAX as u128) as u64
}

fn to_percent(confidence: f32) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}
