//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a TOML file. Anything that can change at
//! runtime (the LLM API key) is resolved by the service with the database
//! taking priority over environment and TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default HTTP bind address for stak-enrich
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";

/// Email providers whose domain says nothing about the user's employer
pub const DEFAULT_CONSUMER_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
    "live.com",
    "me.com",
];

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generative-text service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Enrichment pipeline tuning
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: default_bind_address(),
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (lowest priority source, see stak-enrich config resolution)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Transport timeout for a single request
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// USD per 1000 prompt tokens, used for usage accounting
    #[serde(default = "default_input_cost_per_1k")]
    pub input_cost_per_1k: f64,

    /// USD per 1000 completion tokens
    #[serde(default = "default_output_cost_per_1k")]
    pub output_cost_per_1k: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
            input_cost_per_1k: default_input_cost_per_1k(),
            output_cost_per_1k: default_output_cost_per_1k(),
        }
    }
}

/// Enrichment pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Email domains never treated as a company domain
    #[serde(default = "default_consumer_domains")]
    pub consumer_domains: Vec<String>,

    /// Proposals below this confidence are discarded
    #[serde(default = "default_min_field_confidence")]
    pub min_field_confidence: f32,

    /// Confidence stamped on metadata rows written by enrichment
    #[serde(default = "default_metadata_confidence")]
    pub default_metadata_confidence: f32,

    /// Bounded capacity of the background enrichment queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            consumer_domains: default_consumer_domains(),
            min_field_confidence: default_min_field_confidence(),
            default_metadata_confidence: default_metadata_confidence(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_input_cost_per_1k() -> f64 {
    0.00015
}

fn default_output_cost_per_1k() -> f64 {
    0.0006
}

fn default_consumer_domains() -> Vec<String> {
    DEFAULT_CONSUMER_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn default_min_field_confidence() -> f32 {
    0.5
}

fn default_metadata_confidence() -> f32 {
    0.7
}

fn default_queue_capacity() -> usize {
    256
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = toml_config.and_then(|c| c.root_folder.clone()) {
        return root;
    }

    default_root_folder()
}

/// Default configuration file path (`~/.config/stak/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stak").join("config.toml"))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stak"))
        .unwrap_or_else(|| PathBuf::from("./stak_data"))
}

/// Load TOML configuration
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write TOML configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_policy() {
        let config = TomlConfig::default();
        assert_eq!(config.enrichment.min_field_confidence, 0.5);
        assert_eq!(config.enrichment.default_metadata_confidence, 0.7);
        assert!(config
            .enrichment
            .consumer_domains
            .iter()
            .any(|d| d == "gmail.com"));
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn test_cli_arg_wins() {
        let toml = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolved = resolve_root_folder(Some("/from/cli"), "STAK_TEST_UNSET_VAR", Some(&toml));
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.enrichment.queue_capacity, 256);
    }
}
