//! ProfileEnrichment history (append-only)

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use stak_common::{Error, Result};
use uuid::Uuid;

use super::{parse_json, parse_timestamp};
use crate::models::{NewProfileEnrichment, ProfileEnrichmentRecord};

/// Append one enrichment attempt, returning its id
pub async fn insert_profile_enrichment(
    pool: &SqlitePool,
    record: &NewProfileEnrichment,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let payload = serde_json::to_string(&record.payload)?;
    let sources = serde_json::to_string(&record.sources)?;

    sqlx::query(
        r#"
        INSERT INTO profile_enrichments (
            id, user_id, payload, sources, enrichment_type, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&record.user_id)
    .bind(&payload)
    .bind(&sources)
    .bind(record.enrichment_type.as_str())
    .bind(record.status.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(id)
}

/// Enrichment history for a user, newest first
pub async fn list_profile_enrichments(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ProfileEnrichmentRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, payload, sources, enrichment_type, status, created_at
        FROM profile_enrichments
        WHERE user_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let payload: String = row.get("payload");
            let sources: String = row.get("sources");
            let enrichment_type: String = row.get("enrichment_type");
            let status: String = row.get("status");
            let created_at: String = row.get("created_at");

            Ok(ProfileEnrichmentRecord {
                id: row.get("id"),
                user_id: row.get("user_id"),
                payload: parse_json(&payload, "payload")?,
                sources: parse_json(&sources, "sources")?,
                enrichment_type: enrichment_type.parse().map_err(Error::Internal)?,
                status: status.parse().map_err(Error::Internal)?,
                created_at: parse_timestamp(&created_at, "created_at")?,
            })
        })
        .collect()
}
