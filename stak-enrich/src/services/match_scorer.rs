//! Match scoring
//!
//! Scores two members through the generative service. The scoring itself is
//! opaque; this module only builds the request, validates the reply and
//! persists the result.

use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{match_scores, profiles, trust_signals, usage};
use crate::models::{MatchScoreRecord, NewLlmUsage, Profile};
use crate::services::llm_client::{GenerationRequest, LlmError, TextGenerator};

/// Feature tag for usage accounting
pub const USAGE_FEATURE: &str = "match_scoring";

const MAX_REASONS: usize = 5;

const SYSTEM_PROMPT: &str = "You assess professional networking fit between two people. \
Respond with a single JSON object: {\"score\": <integer 0-100>, \"reasons\": [<short strings>]}.";

#[derive(Debug, Error)]
pub enum MatchScoreError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Scoring call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed score response: {0}")]
    Malformed(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] stak_common::Error),
}

pub struct MatchScorer {
    pool: SqlitePool,
    generator: Arc<dyn TextGenerator>,
}

impl MatchScorer {
    pub fn new(pool: SqlitePool, generator: Arc<dyn TextGenerator>) -> Self {
        Self { pool, generator }
    }

    /// Score `user_a` against `user_b` and store the result
    pub async fn score(&self, user_a: &str, user_b: &str) -> Result<MatchScoreRecord, MatchScoreError> {
        let a = self.load(user_a).await?;
        let b = self.load(user_b).await?;

        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Person A: {}\nPerson B: {}",
                self.describe(&a).await?,
                self.describe(&b).await?
            ),
            temperature: 0.0,
        };

        let completion = self.generator.generate_json(&request).await?;

        let usage_row = NewLlmUsage {
            user_id: Some(a.id.clone()),
            feature: USAGE_FEATURE.to_string(),
            model: completion.model.clone(),
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            cost_usd: completion.usage.cost_usd,
        };
        if let Err(e) = usage::record_llm_usage(&self.pool, &usage_row).await {
            warn!(user_a, user_b, error = %e, "Failed to record LLM usage");
        }

        let reply = completion.json_object()?;
        let (score, reasons) = parse_score(&Value::Object(reply))?;

        let record =
            match_scores::insert_match_score(&self.pool, &a.id, &b.id, score, &reasons).await?;
        info!(user_a, user_b, score, "Stored match score");

        Ok(record)
    }

    async fn load(&self, user_id: &str) -> Result<Profile, MatchScoreError> {
        profiles::load_profile(&self.pool, user_id)
            .await?
            .ok_or_else(|| MatchScoreError::NotFound(user_id.to_string()))
    }

    /// Core fields plus verified links
    async fn describe(&self, profile: &Profile) -> Result<Value, MatchScoreError> {
        let verified_links = trust_signals::load_trust_signals(&self.pool, &profile.id)
            .await?
            .and_then(|doc| doc.get("verified_links").cloned())
            .unwrap_or_else(|| json!({}));

        Ok(json!({
            "name": profile.full_name(),
            "headline": profile.headline,
            "title": profile.title,
            "company": profile.company,
            "location": profile.location,
            "industries": profile.industries,
            "skills": profile.skills,
            "interests": profile.interests,
            "verified_links": verified_links,
        }))
    }
}

/// Extract `(score, reasons)`; the score is clamped to 0..=100
pub fn parse_score(reply: &Value) -> Result<(u8, Vec<String>), MatchScoreError> {
    let score = reply
        .get("score")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite())
        .ok_or_else(|| MatchScoreError::Malformed("missing numeric score".to_string()))?;

    let reasons = reply
        .get("reasons")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(MAX_REASONS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok((score.round().clamp(0.0, 100.0) as u8, reasons))
}
