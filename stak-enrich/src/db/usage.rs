//! LLM token and cost accounting

use chrono::Utc;
use sqlx::SqlitePool;
use stak_common::{Error, Result};
use uuid::Uuid;

use crate::models::NewLlmUsage;

/// Record one generative call
pub async fn record_llm_usage(pool: &SqlitePool, usage: &NewLlmUsage) -> Result<()> {
    let total_tokens = usage.prompt_tokens as i64 + usage.completion_tokens as i64;

    sqlx::query(
        r#"
        INSERT INTO llm_usage (
            id, user_id, feature, model, prompt_tokens, completion_tokens,
            total_tokens, cost_usd, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&usage.user_id)
    .bind(&usage.feature)
    .bind(&usage.model)
    .bind(usage.prompt_tokens as i64)
    .bind(usage.completion_tokens as i64)
    .bind(total_tokens)
    .bind(usage.cost_usd)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Total tokens spent on a feature (diagnostics)
pub async fn total_tokens_for_feature(pool: &SqlitePool, feature: &str) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_tokens), 0) FROM llm_usage WHERE feature = ?",
    )
    .bind(feature)
    .fetch_one(pool)
    .await?;

    Ok(total)
}
