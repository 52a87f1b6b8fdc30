//! Trust-signal documents (match_signals)

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use stak_common::{Error, Result};

use super::parse_json;

/// Load the trust-signal document for a user
pub async fn load_trust_signals(pool: &SqlitePool, user_id: &str) -> Result<Option<Value>> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT trust_signals FROM match_signals WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    raw.map(|s| parse_json(&s, "trust_signals")).transpose()
}

/// Store the full trust-signal document, inserting the row if missing
pub async fn upsert_trust_signals(pool: &SqlitePool, user_id: &str, signals: &Value) -> Result<()> {
    let document = serde_json::to_string(signals)?;

    sqlx::query(
        r#"
        INSERT INTO match_signals (user_id, trust_signals, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            trust_signals = excluded.trust_signals,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(&document)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_row_is_none() {
        let pool = setup_test_db().await;
        assert!(load_trust_signals(&pool, "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_document() {
        let pool = setup_test_db().await;

        upsert_trust_signals(&pool, "u1", &json!({"a": 1})).await.unwrap();
        upsert_trust_signals(&pool, "u1", &json!({"b": 2})).await.unwrap();

        let stored = load_trust_signals(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(stored, json!({"b": 2}));
    }
}
