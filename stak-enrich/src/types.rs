//! Core types for the enrichment pipeline
//!
//! Value objects passed between pipeline stages. Persisted row types live in
//! [`crate::models`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Trigger and status enums
// ============================================================================

/// Why an enrichment run was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Signup
    Initial,
    /// Periodic or user-initiated refresh
    Refresh,
    /// Explicitly requested by the user
    Manual,
    /// Gated by explicit opt-in to public-source enrichment
    ConsentBased,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Initial => "initial",
            TriggerType::Refresh => "refresh",
            TriggerType::Manual => "manual",
            TriggerType::ConsentBased => "consent_based",
        }
    }

    /// Triggers that may only run when the profile opted in
    pub fn requires_consent(&self) -> bool {
        matches!(self, TriggerType::Manual | TriggerType::ConsentBased)
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(TriggerType::Initial),
            "refresh" => Ok(TriggerType::Refresh),
            "manual" => Ok(TriggerType::Manual),
            "consent_based" => Ok(TriggerType::ConsentBased),
            other => Err(format!("unknown enrichment trigger: {}", other)),
        }
    }
}

/// Status of a ProfileEnrichment history row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Completed,
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentStatus::Completed => "completed",
            EnrichmentStatus::Failed => "failed",
        }
    }
}

impl FromStr for EnrichmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(EnrichmentStatus::Completed),
            "failed" => Ok(EnrichmentStatus::Failed),
            other => Err(format!("unknown enrichment status: {}", other)),
        }
    }
}

/// Status of an EnrichmentLog row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    /// Normalizer produced at least one field and everything persisted
    Success,
    /// Everything persisted but the normalizer produced nothing
    Partial,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Partial => "partial",
            LogStatus::Failed => "failed",
        }
    }
}

impl FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(LogStatus::Success),
            "partial" => Ok(LogStatus::Partial),
            "failed" => Ok(LogStatus::Failed),
            other => Err(format!("unknown log status: {}", other)),
        }
    }
}

/// How a field's current value was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Entered by the user
    User,
    /// Seed/import default
    Db,
    /// Derived by the enrichment pipeline
    Enrichment,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::User => "user",
            Provenance::Db => "db",
            Provenance::Enrichment => "enrichment",
        }
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Provenance::User),
            "db" => Ok(Provenance::Db),
            "enrichment" => Ok(Provenance::Enrichment),
            other => Err(format!("unknown provenance: {}", other)),
        }
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Deterministic signals gathered from a profile for one run
///
/// Serialized into `profile_enrichments.sources`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub website_urls: Vec<String>,
}

impl EnrichmentSources {
    /// Every non-empty source value, in declaration order
    pub fn flatten(&self) -> Vec<String> {
        [
            &self.email_domain,
            &self.company_url,
            &self.gravatar_url,
            &self.linkedin_url,
            &self.twitter_url,
            &self.github_url,
        ]
        .into_iter()
        .flatten()
        .chain(self.website_urls.iter())
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect()
    }

    /// Names of the social-URL fields that carry a value
    pub fn known_social_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.linkedin_url.is_some() {
            fields.push("linkedinUrl");
        }
        if self.twitter_url.is_some() {
            fields.push("twitterUrl");
        }
        if self.github_url.is_some() {
            fields.push("githubUrl");
        }
        if !self.website_urls.is_empty() {
            fields.push("websiteUrls");
        }
        fields
    }
}

// ============================================================================
// Enriched fields
// ============================================================================

/// Profile fields the normalizer may propose values for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Headline,
    Title,
    Company,
    Location,
    Bio,
    Industries,
    Skills,
    Interests,
}

impl ProfileField {
    /// Every requestable field, in prompt order
    pub const ALL: [ProfileField; 8] = [
        ProfileField::Headline,
        ProfileField::Title,
        ProfileField::Company,
        ProfileField::Location,
        ProfileField::Bio,
        ProfileField::Industries,
        ProfileField::Skills,
        ProfileField::Interests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Headline => "headline",
            ProfileField::Title => "title",
            ProfileField::Company => "company",
            ProfileField::Location => "location",
            ProfileField::Bio => "bio",
            ProfileField::Industries => "industries",
            ProfileField::Skills => "skills",
            ProfileField::Interests => "interests",
        }
    }

    /// True for fields holding a list of strings
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            ProfileField::Industries | ProfileField::Skills | ProfileField::Interests
        )
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown profile field: {}", s))
    }
}

/// A proposed field value: free text or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Non-empty text, or a list with at least one non-empty entry
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::List(items) => items.iter().any(|i| !i.trim().is_empty()),
        }
    }
}

/// Normalizer output: accepted values keyed by field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichedProfileData(BTreeMap<ProfileField, FieldValue>);

impl EnrichedProfileData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: ProfileField, value: FieldValue) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: ProfileField) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProfileField, &FieldValue)> {
        self.0.iter()
    }

    /// Field names in stable order
    pub fn field_names(&self) -> Vec<String> {
        self.0.keys().map(|f| f.as_str().to_string()).collect()
    }
}

impl FromIterator<(ProfileField, FieldValue)> for EnrichedProfileData {
    fn from_iter<I: IntoIterator<Item = (ProfileField, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Run outcome
// ============================================================================

/// Result of one `enrich_profile` invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched_data: Option<EnrichedProfileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<EnrichmentSources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichmentOutcome {
    pub fn succeeded(enriched_data: EnrichedProfileData, sources: EnrichmentSources) -> Self {
        Self {
            success: true,
            enriched_data: Some(enriched_data),
            sources: Some(sources),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            enriched_data: None,
            sources: None,
            error: Some(error.into()),
        }
    }
}
