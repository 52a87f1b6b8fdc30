//! Persisted records
//!
//! Row shapes for the tables created in `stak_common::db::init`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EnrichmentSources, EnrichmentStatus, LogStatus, Provenance, TriggerType};

/// Canonical member profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub website_urls: Vec<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// "yes" when the member opted in to public-source enrichment
    #[serde(default)]
    pub public_enrichment_consent: Option<String>,
}

impl Profile {
    /// First and last name joined, skipping blanks
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.last_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_public_enrichment_consent(&self) -> bool {
        self.public_enrichment_consent.as_deref() == Some("yes")
    }
}

/// Append-only enrichment attempt, as read back from the database
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEnrichmentRecord {
    pub id: String,
    pub user_id: String,
    pub payload: serde_json::Value,
    pub sources: EnrichmentSources,
    pub enrichment_type: TriggerType,
    pub status: EnrichmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Enrichment attempt to insert
#[derive(Debug, Clone)]
pub struct NewProfileEnrichment {
    pub user_id: String,
    pub payload: serde_json::Value,
    pub sources: EnrichmentSources,
    pub enrichment_type: TriggerType,
    pub status: EnrichmentStatus,
}

/// Diagnostic log entry to insert
#[derive(Debug, Clone)]
pub struct NewEnrichmentLog {
    pub user_id: String,
    pub source: String,
    pub extracted_fields: Vec<String>,
    /// 0-100
    pub match_confidence: u8,
    pub status: LogStatus,
    pub enrichment_type: TriggerType,
    pub error_message: Option<String>,
    pub processing_time_ms: u64,
}

/// Diagnostic log entry as stored
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentLogRecord {
    pub id: String,
    pub user_id: String,
    pub source: String,
    pub extracted_fields: Vec<String>,
    pub match_confidence: u8,
    pub status: LogStatus,
    pub enrichment_type: String,
    pub error_message: Option<String>,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Insert-or-update request for one (user, field) trust ledger row
#[derive(Debug, Clone)]
pub struct MetadataUpsert {
    pub user_id: String,
    pub field_name: String,
    pub provenance: Provenance,
    pub confidence: f32,
    pub sources: Vec<String>,
}

/// One row of the field trust ledger
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadataRecord {
    pub user_id: String,
    pub field_name: String,
    pub provenance: Provenance,
    pub confidence: f32,
    pub sources: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Token accounting for one generative call
#[derive(Debug, Clone)]
pub struct NewLlmUsage {
    pub user_id: Option<String>,
    pub feature: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
}

/// Stored match score between two members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScoreRecord {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub score: u8,
    pub reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
}
