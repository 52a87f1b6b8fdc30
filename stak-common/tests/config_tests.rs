//! Configuration loading tests
//!
//! Tests that touch STAK_ROOT run under #[serial] to avoid ENV races.

use serial_test::serial;
use stak_common::config::{
    load_toml_config, resolve_root_folder, write_toml_config, TomlConfig,
};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_toml_config(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.enrichment.min_field_confidence, 0.5);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, stak_common::Error::Config(_)));
}

#[test]
fn test_write_then_load_preserves_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sub").join("config.toml");

    let mut config = TomlConfig::default();
    config.llm.model = "gpt-4o".to_string();
    config.enrichment.consumer_domains = vec!["example-mail.com".to_string()];
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.llm.model, "gpt-4o");
    assert_eq!(loaded.enrichment.consumer_domains, vec!["example-mail.com"]);
    assert!(!path.with_extension("toml.tmp").exists(), "Temp file should be renamed away");
}

#[test]
#[serial]
fn test_env_overrides_toml_root_folder() {
    std::env::set_var("STAK_ROOT_TEST", "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, "STAK_ROOT_TEST", Some(&toml));
    assert_eq!(resolved, PathBuf::from("/from/env"));

    std::env::remove_var("STAK_ROOT_TEST");
}

#[test]
#[serial]
fn test_toml_used_when_env_unset() {
    std::env::remove_var("STAK_ROOT_TEST");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, "STAK_ROOT_TEST", Some(&toml));
    assert_eq!(resolved, PathBuf::from("/from/toml"));
}
