//! Field normalization via the generative-text service
//!
//! Asks the model for `{value, confidence, sources}` per profile field and
//! keeps only proposals at or above the confidence threshold. Failures never
//! escape: the caller always receives a (possibly empty) field map.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::EnrichmentStore;
use crate::models::{NewLlmUsage, Profile};
use crate::services::llm_client::{GenerationRequest, LlmError, TextGenerator};
use crate::types::{EnrichedProfileData, EnrichmentSources, FieldValue, ProfileField};

/// Feature tag for usage accounting
pub const USAGE_FEATURE: &str = "profile_enrichment";

/// Max source URLs the model may cite per field
pub const MAX_SOURCES_PER_FIELD: usize = 3;

const SYSTEM_PROMPT: &str = "You normalize professional networking profiles. \
Respond with a single JSON object and nothing else. For each field you can improve, \
return {\"value\": ..., \"confidence\": <number between 0 and 1>, \"sources\": [<at most 3 URLs>]}. \
Omit fields you cannot support with evidence.";

/// Result of one normalization attempt
#[derive(Debug)]
pub enum NormalizationOutcome {
    /// At least one field cleared the threshold
    Enriched(FilteredProposals),
    /// The call succeeded but nothing was usable
    NothingUsable,
    /// The call or response parsing failed
    CallFailed(LlmError),
}

impl NormalizationOutcome {
    /// Field map for persistence; empty unless `Enriched`
    pub fn into_data(self) -> EnrichedProfileData {
        match self {
            NormalizationOutcome::Enriched(accepted) => accepted.data,
            NormalizationOutcome::NothingUsable | NormalizationOutcome::CallFailed(_) => {
                EnrichedProfileData::new()
            }
        }
    }

    pub fn is_call_failure(&self) -> bool {
        matches!(self, NormalizationOutcome::CallFailed(_))
    }
}

/// LLM-backed field normalizer
pub struct FieldNormalizer {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn EnrichmentStore>,
    min_confidence: f32,
}

impl FieldNormalizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn EnrichmentStore>,
        min_confidence: f32,
    ) -> Self {
        Self {
            generator,
            store,
            min_confidence,
        }
    }

    /// Normalize a profile, collapsing every failure to an empty map
    pub async fn normalize_profile(
        &self,
        profile: &Profile,
        sources: &EnrichmentSources,
        context: &str,
    ) -> EnrichedProfileData {
        self.normalize(profile, sources, context).await.into_data()
    }

    /// Normalize a profile, reporting why nothing came back
    pub async fn normalize(
        &self,
        profile: &Profile,
        sources: &EnrichmentSources,
        context: &str,
    ) -> NormalizationOutcome {
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_user_prompt(profile, sources, context),
            temperature: 0.2,
        };

        let completion = match self.generator.generate_json(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "Profile normalization call failed");
                return NormalizationOutcome::CallFailed(e);
            }
        };

        let usage = NewLlmUsage {
            user_id: Some(profile.id.clone()),
            feature: USAGE_FEATURE.to_string(),
            model: completion.model.clone(),
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            cost_usd: completion.usage.cost_usd,
        };
        if let Err(e) = self.store.record_llm_usage(&usage).await {
            warn!(user_id = %profile.id, error = %e, "Failed to record LLM usage");
        }

        let proposals = match completion.json_object() {
            Ok(map) => map,
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "Unparseable normalization response");
                return NormalizationOutcome::CallFailed(e);
            }
        };

        let accepted = filter_proposals(&proposals, self.min_confidence);
        if accepted.data.is_empty() {
            debug!(user_id = %profile.id, "No proposals cleared the confidence threshold");
            NormalizationOutcome::NothingUsable
        } else {
            NormalizationOutcome::Enriched(accepted)
        }
    }
}

/// Proposals that cleared the threshold
#[derive(Debug, Clone, Default)]
pub struct FilteredProposals {
    pub data: EnrichedProfileData,
    /// Mean confidence of the accepted fields, 0.0 when none
    pub mean_confidence: f32,
}

/// Keep proposals whose confidence lies in [0, 1] and is at least `min_confidence`
pub fn filter_proposals(proposals: &Map<String, Value>, min_confidence: f32) -> FilteredProposals {
    let mut data = EnrichedProfileData::new();
    let mut confidence_sum = 0.0f32;

    for (key, proposal) in proposals {
        let Ok(field) = key.parse::<ProfileField>() else {
            debug!(field = %key, "Ignoring unrequested field");
            continue;
        };

        let Some(confidence) = proposal
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c as f32)
            .filter(|c| (0.0..=1.0).contains(c))
        else {
            debug!(field = %field, "Discarding proposal without usable confidence");
            continue;
        };

        if confidence < min_confidence {
            debug!(field = %field, confidence, "Discarding low-confidence proposal");
            continue;
        }

        match proposal.get("value").and_then(|v| coerce_value(field, v)) {
            Some(value) if value.is_truthy() => {
                debug!(field = %field, confidence, "Accepted proposal");
                data.insert(field, value);
                confidence_sum += confidence;
            }
            _ => debug!(field = %field, "Discarding empty proposal"),
        }
    }

    let mean_confidence = if data.is_empty() {
        0.0
    } else {
        confidence_sum / data.len() as f32
    };

    FilteredProposals {
        data,
        mean_confidence,
    }
}

/// Shape a raw JSON value to the field's expected type
fn coerce_value(field: ProfileField, value: &Value) -> Option<FieldValue> {
    if field.is_list() {
        match value {
            Value::Array(items) => Some(FieldValue::List(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Value::String(s) => Some(FieldValue::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    } else {
        value
            .as_str()
            .map(|s| FieldValue::Text(s.trim().to_string()))
    }
}

fn build_user_prompt(profile: &Profile, sources: &EnrichmentSources, context: &str) -> String {
    let current = json!({
        "headline": profile.headline,
        "title": profile.title,
        "company": profile.company,
        "location": profile.location,
        "bio": profile.bio,
        "industries": profile.industries,
        "skills": profile.skills,
        "interests": profile.interests,
    });

    let requested: Vec<&str> = ProfileField::ALL.iter().map(|f| f.as_str()).collect();
    let source_list = sources.flatten();

    format!(
        "Only provide values for fields that are missing or low quality in the current profile.\n\
         Requested fields: {}\n\
         List fields (industries, skills, interests) take arrays of strings.\n\
         Each field must include a confidence between 0 and 1 and at most {} source URLs.\n\n\
         Current profile: {}\n\
         Known sources: {}\n\n\
         Search context:\n{}",
        requested.join(", "),
        MAX_SOURCES_PER_FIELD,
        current,
        serde_json::to_string(&source_list).unwrap_or_else(|_| "[]".to_string()),
        context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_test_db;
    use crate::db::{usage::total_tokens_for_feature, SqliteEnrichmentStore};
    use crate::services::llm_client::{Completion, TokenUsage};
    use async_trait::async_trait;

    struct ScriptedGenerator {
        reply: Result<String, u16>,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate_json(&self, _: &GenerationRequest) -> Result<Completion, LlmError> {
            match &self.reply {
                Ok(content) => Ok(Completion {
                    content: content.clone(),
                    model: "scripted".into(),
                    usage: TokenUsage {
                        prompt_tokens: 50,
                        completion_tokens: 10,
                        cost_usd: 0.0,
                    },
                }),
                Err(status) => Err(LlmError::Api(*status, "down".into())),
            }
        }
    }

    fn profile() -> Profile {
        Profile {
            id: "u1".into(),
            first_name: Some("Ada".into()),
            ..Default::default()
        }
    }

    async fn build_normalizer(reply: Result<String, u16>) -> (FieldNormalizer, sqlx::SqlitePool) {
        let pool = setup_test_db().await;
        let store = Arc::new(SqliteEnrichmentStore::new(pool.clone()));
        let generator = Arc::new(ScriptedGenerator { reply });
        (FieldNormalizer::new(generator, store, 0.5), pool)
    }

    #[test]
    fn test_confidence_threshold() {
        let proposals = json!({
            "bio": {"value": "Writes notes", "confidence": 0.4},
            "title": {"value": "Engineer", "confidence": 0.9},
            "location": {"value": "London", "confidence": 0.5},
        });

        let accepted = filter_proposals(proposals.as_object().unwrap(), 0.5);
        let data = &accepted.data;

        assert!(!data.contains(ProfileField::Bio));
        assert_eq!(
            data.get(ProfileField::Title),
            Some(&FieldValue::Text("Engineer".into()))
        );
        assert!(data.contains(ProfileField::Location));
        assert!((accepted.mean_confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_missing_or_non_numeric_confidence_discarded() {
        let proposals = json!({
            "title": {"value": "Engineer"},
            "company": {"value": "Acme", "confidence": "high"},
            "headline": {"value": "Builder", "confidence": null},
        });

        let accepted = filter_proposals(proposals.as_object().unwrap(), 0.5);
        assert!(accepted.data.is_empty());
        assert_eq!(accepted.mean_confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_confidence_discarded() {
        let proposals = json!({
            "title": {"value": "Engineer", "confidence": 85},
            "company": {"value": "Acme", "confidence": -0.2},
            "location": {"value": "London", "confidence": 1.0},
        });

        let accepted = filter_proposals(proposals.as_object().unwrap(), 0.5);

        assert!(!accepted.data.contains(ProfileField::Title));
        assert!(!accepted.data.contains(ProfileField::Company));
        assert!(accepted.data.contains(ProfileField::Location));
        assert_eq!(accepted.data.len(), 1);
        assert_eq!(accepted.mean_confidence, 1.0);
    }

    #[test]
    fn test_list_fields_and_unknown_keys() {
        let proposals = json!({
            "skills": {"value": ["Rust", " ", "SQL"], "confidence": 0.8},
            "interests": {"value": "chess, go", "confidence": 0.8},
            "industries": {"value": [], "confidence": 0.9},
            "favorite_color": {"value": "blue", "confidence": 1.0},
        });

        let data = filter_proposals(proposals.as_object().unwrap(), 0.5).data;

        assert_eq!(
            data.get(ProfileField::Skills),
            Some(&FieldValue::List(vec!["Rust".into(), "SQL".into()]))
        );
        assert_eq!(
            data.get(ProfileField::Interests),
            Some(&FieldValue::List(vec!["chess".into(), "go".into()]))
        );
        assert!(!data.contains(ProfileField::Industries));
        assert_eq!(data.len(), 2);
    }

    #[tokio::test]
    async fn test_enriched_outcome_records_usage() {
        let reply = r#"{"title": {"value": "CTO", "confidence": 0.9, "sources": []}}"#;
        let (normalizer, pool) = build_normalizer(Ok(reply.into())).await;

        let outcome = normalizer
            .normalize(&profile(), &EnrichmentSources::default(), "ctx")
            .await;

        assert!(matches!(outcome, NormalizationOutcome::Enriched(ref a) if a.data.len() == 1));
        assert_eq!(
            total_tokens_for_feature(&pool, USAGE_FEATURE).await.unwrap(),
            60
        );
    }

    #[tokio::test]
    async fn test_nothing_usable_is_distinct_from_failure() {
        let reply = r#"{"bio": {"value": "x", "confidence": 0.1}}"#;
        let (normalizer, _pool) = build_normalizer(Ok(reply.into())).await;

        let outcome = normalizer
            .normalize(&profile(), &EnrichmentSources::default(), "ctx")
            .await;
        assert!(matches!(outcome, NormalizationOutcome::NothingUsable));
    }

    #[tokio::test]
    async fn test_failures_collapse_to_empty_map() {
        let (normalizer, _pool) = build_normalizer(Err(500)).await;
        let outcome = normalizer
            .normalize(&profile(), &EnrichmentSources::default(), "ctx")
            .await;
        assert!(outcome.is_call_failure());

        let (normalizer, _pool) = normalizer_with_garbage().await;
        let data = normalizer
            .normalize_profile(&profile(), &EnrichmentSources::default(), "ctx")
            .await;
        assert!(data.is_empty());
    }

    async fn normalizer_with_garbage() -> (FieldNormalizer, sqlx::SqlitePool) {
        build_normalizer(Ok("I cannot help with that".into())).await
    }
}
