//! Field trust ledger (profile_metadata)
//!
//! One row per (user, field). Writes replace the previous decision.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use stak_common::{Error, Result};

use super::{parse_json, parse_timestamp};
use crate::models::{MetadataUpsert, ProfileMetadataRecord};

/// Insert or replace the metadata row for (user, field)
pub async fn upsert_profile_metadata(pool: &SqlitePool, upsert: &MetadataUpsert) -> Result<()> {
    if !(0.0..=1.0).contains(&upsert.confidence) {
        return Err(Error::InvalidInput(format!(
            "confidence {} outside [0, 1] for field {}",
            upsert.confidence, upsert.field_name
        )));
    }

    let sources = serde_json::to_string(&upsert.sources)?;

    sqlx::query(
        r#"
        INSERT INTO profile_metadata (
            user_id, field_name, provenance, confidence, sources, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, field_name) DO UPDATE SET
            provenance = excluded.provenance,
            confidence = excluded.confidence,
            sources = excluded.sources,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&upsert.user_id)
    .bind(&upsert.field_name)
    .bind(upsert.provenance.as_str())
    .bind(upsert.confidence as f64)
    .bind(&sources)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// All metadata rows for a user, ordered by field name
pub async fn list_profile_metadata(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ProfileMetadataRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, field_name, provenance, confidence, sources, updated_at
        FROM profile_metadata
        WHERE user_id = ?
        ORDER BY field_name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let provenance: String = row.get("provenance");
            let sources: String = row.get("sources");
            let updated_at: String = row.get("updated_at");

            Ok(ProfileMetadataRecord {
                user_id: row.get("user_id"),
                field_name: row.get("field_name"),
                provenance: provenance.parse().map_err(Error::Internal)?,
                confidence: row.get::<f64, _>("confidence") as f32,
                sources: parse_json(&sources, "sources")?,
                updated_at: parse_timestamp(&updated_at, "updated_at")?,
            })
        })
        .collect()
}
