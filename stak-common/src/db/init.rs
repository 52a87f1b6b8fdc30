//! Database initialization
//!
//! Every table is created with `CREATE TABLE IF NOT EXISTS`, so opening an
//! existing database is a no-op apart from pending migrations.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets the HTTP readers proceed while the enrichment worker writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_all_tables(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table used by STAK services (idempotent)
///
/// Exposed separately so tests can build the schema on an in-memory pool.
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_profiles_table(pool).await?;
    create_profile_enrichments_table(pool).await?;
    create_enrichment_logs_table(pool).await?;
    create_profile_metadata_table(pool).await?;
    create_match_signals_table(pool).await?;
    create_llm_usage_table(pool).await?;
    create_match_scores_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime key-value settings (e.g. the LLM API key).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profiles table
///
/// List-valued columns (skills, industries, interests, website_urls) hold
/// JSON arrays.
pub async fn create_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            headline TEXT,
            title TEXT,
            company TEXT,
            location TEXT,
            bio TEXT,
            skills TEXT NOT NULL DEFAULT '[]',
            industries TEXT NOT NULL DEFAULT '[]',
            interests TEXT NOT NULL DEFAULT '[]',
            linkedin_url TEXT,
            twitter_url TEXT,
            github_url TEXT,
            website_urls TEXT NOT NULL DEFAULT '[]',
            avatar_url TEXT,
            public_enrichment_consent TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profile_enrichments table (append-only attempt history)
pub async fn create_profile_enrichments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile_enrichments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id),
            payload TEXT NOT NULL,
            sources TEXT NOT NULL,
            enrichment_type TEXT NOT NULL
                CHECK (enrichment_type IN ('initial', 'refresh', 'manual', 'consent_based')),
            status TEXT NOT NULL CHECK (status IN ('completed', 'failed')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the enrichment_logs table (diagnostics, one row per attempt)
pub async fn create_enrichment_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrichment_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            extracted_fields TEXT NOT NULL DEFAULT '[]',
            match_confidence INTEGER NOT NULL DEFAULT 0
                CHECK (match_confidence BETWEEN 0 AND 100),
            status TEXT NOT NULL CHECK (status IN ('success', 'partial', 'failed')),
            enrichment_type TEXT NOT NULL,
            error_message TEXT,
            processing_time_ms INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profile_metadata table
///
/// The composite primary key enforces one row per (user, field).
pub async fn create_profile_metadata_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile_metadata (
            user_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            provenance TEXT NOT NULL CHECK (provenance IN ('user', 'db', 'enrichment')),
            confidence REAL NOT NULL CHECK (confidence BETWEEN 0.0 AND 1.0),
            sources TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, field_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the match_signals table (one trust-signal document per user)
pub async fn create_match_signals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_signals (
            user_id TEXT PRIMARY KEY,
            trust_signals TEXT NOT NULL DEFAULT '{}',
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the llm_usage table (token and cost accounting per call)
pub async fn create_llm_usage_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS llm_usage (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            feature TEXT NOT NULL,
            model TEXT NOT NULL,
            prompt_tokens INTEGER NOT NULL DEFAULT 0,
            completion_tokens INTEGER NOT NULL DEFAULT 0,
            total_tokens INTEGER NOT NULL DEFAULT 0,
            cost_usd REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the match_scores table
pub async fn create_match_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_scores (
            id TEXT PRIMARY KEY,
            user_a TEXT NOT NULL,
            user_b TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            reasons TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
