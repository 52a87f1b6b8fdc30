//! Enrichment pipeline services

pub mod context_builder;
pub mod enrichment_orchestrator;
pub mod enrichment_queue;
pub mod enrichment_recorder;
pub mod field_normalizer;
pub mod llm_client;
pub mod match_scorer;
pub mod metadata_updater;
pub mod source_gatherer;
pub mod trust_signal_updater;

pub use context_builder::build_search_context;
pub use enrichment_orchestrator::{EnrichmentError, EnrichmentOrchestrator};
pub use enrichment_queue::{EnrichmentQueue, QueueError};
pub use enrichment_recorder::EnrichmentRecorder;
pub use field_normalizer::{FieldNormalizer, NormalizationOutcome};
pub use llm_client::{ChatCompletionClient, LlmError, TextGenerator};
pub use match_scorer::{MatchScoreError, MatchScorer};
pub use metadata_updater::MetadataUpdater;
pub use source_gatherer::SourceGatherer;
pub use trust_signal_updater::TrustSignalUpdater;
