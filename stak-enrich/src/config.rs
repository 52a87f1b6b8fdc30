//! Configuration resolution for stak-enrich
//!
//! Multi-tier resolution with Database → ENV → TOML priority for the LLM API
//! key, plus validated pipeline tuning from the `[enrichment]` section.

use sqlx::{Pool, Sqlite};
use stak_common::config::TomlConfig;
use stak_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable holding the LLM API key
pub const LLM_API_KEY_ENV: &str = "STAK_LLM_API_KEY";

/// Resolve the LLM API key
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_llm_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    let db_key = crate::db::settings::get_llm_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    if db_key.is_some() {
        sources.push("database");
    }

    let env_key = std::env::var(LLM_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    if env_key.is_some() {
        sources.push("environment");
    }

    let toml_key = toml_config
        .llm
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "LLM API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("LLM API key loaded from database");
        return Ok(key);
    }

    if let Some(key) = env_key {
        info!("LLM API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("LLM API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "LLM API key not configured. Set one of:\n\
         1. settings table: key = 'llm_api_key'\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: [llm] api_key = \"your-key\"",
        LLM_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Validated pipeline tuning
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentSettings {
    pub consumer_domains: Vec<String>,
    pub min_field_confidence: f32,
    pub metadata_confidence: f32,
    pub queue_capacity: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        // TomlConfig defaults are always valid
        let enrichment = TomlConfig::default().enrichment;
        Self {
            consumer_domains: enrichment.consumer_domains,
            min_field_confidence: enrichment.min_field_confidence,
            metadata_confidence: enrichment.default_metadata_confidence,
            queue_capacity: enrichment.queue_capacity,
        }
    }
}

impl EnrichmentSettings {
    /// Validate and copy the `[enrichment]` section
    pub fn from_toml(config: &TomlConfig) -> Result<Self> {
        let e = &config.enrichment;

        check_unit_interval("enrichment.min_field_confidence", e.min_field_confidence)?;
        check_unit_interval(
            "enrichment.default_metadata_confidence",
            e.default_metadata_confidence,
        )?;

        if e.queue_capacity == 0 {
            return Err(Error::Config(
                "enrichment.queue_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            consumer_domains: e
                .consumer_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            min_field_confidence: e.min_field_confidence,
            metadata_confidence: e.default_metadata_confidence,
            queue_capacity: e.queue_capacity,
        })
    }
}

fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be within [0, 1], got {}", name, value)))
    }
}
