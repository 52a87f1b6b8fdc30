//! Enrichment diagnostic log

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use stak_common::{Error, Result};
use uuid::Uuid;

use super::{parse_json, parse_timestamp};
use crate::models::{EnrichmentLogRecord, NewEnrichmentLog};

/// Write one diagnostic row, returning its id
pub async fn insert_enrichment_log(pool: &SqlitePool, log: &NewEnrichmentLog) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let extracted_fields = serde_json::to_string(&log.extracted_fields)?;

    sqlx::query(
        r#"
        INSERT INTO enrichment_logs (
            id, user_id, source, extracted_fields, match_confidence, status,
            enrichment_type, error_message, processing_time_ms, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&log.user_id)
    .bind(&log.source)
    .bind(&extracted_fields)
    .bind(log.match_confidence.min(100) as i64)
    .bind(log.status.as_str())
    .bind(log.enrichment_type.as_str())
    .bind(&log.error_message)
    .bind(log.processing_time_ms as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(id)
}

/// Log rows for a user, newest first
pub async fn list_enrichment_logs(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<EnrichmentLogRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, source, extracted_fields, match_confidence, status,
               enrichment_type, error_message, processing_time_ms, created_at
        FROM enrichment_logs
        WHERE user_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let extracted_fields: String = row.get("extracted_fields");
            let status: String = row.get("status");
            let created_at: String = row.get("created_at");

            Ok(EnrichmentLogRecord {
                id: row.get("id"),
                user_id: row.get("user_id"),
                source: row.get("source"),
                extracted_fields: parse_json(&extracted_fields, "extracted_fields")?,
                match_confidence: row.get::<i64, _>("match_confidence").clamp(0, 100) as u8,
                status: status.parse().map_err(Error::Internal)?,
                enrichment_type: row.get("enrichment_type"),
                error_message: row.get("error_message"),
                processing_time_ms: row.get::<i64, _>("processing_time_ms").max(0) as u64,
                created_at: parse_timestamp(&created_at, "created_at")?,
            })
        })
        .collect()
}
