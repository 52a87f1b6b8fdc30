//! Stored match scores

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use stak_common::{Error, Result};
use uuid::Uuid;

use super::{parse_json, parse_timestamp};
use crate::models::MatchScoreRecord;

/// Store a score between two members, returning the stored record
pub async fn insert_match_score(
    pool: &SqlitePool,
    user_a: &str,
    user_b: &str,
    score: u8,
    reasons: &[String],
) -> Result<MatchScoreRecord> {
    let record = MatchScoreRecord {
        id: Uuid::new_v4().to_string(),
        user_a: user_a.to_string(),
        user_b: user_b.to_string(),
        score: score.min(100),
        reasons: reasons.to_vec(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO match_scores (id, user_a, user_b, score, reasons, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_a)
    .bind(&record.user_b)
    .bind(record.score as i64)
    .bind(serde_json::to_string(&record.reasons)?)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(record)
}

/// Most recent score for an unordered pair
pub async fn latest_match_score(
    pool: &SqlitePool,
    user_a: &str,
    user_b: &str,
) -> Result<Option<MatchScoreRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_a, user_b, score, reasons, created_at
        FROM match_scores
        WHERE (user_a = ?1 AND user_b = ?2) OR (user_a = ?2 AND user_b = ?1)
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let reasons: String = row.get("reasons");
        let created_at: String = row.get("created_at");
        Ok(MatchScoreRecord {
            id: row.get("id"),
            user_a: row.get("user_a"),
            user_b: row.get("user_b"),
            score: row.get::<i64, _>("score").clamp(0, 100) as u8,
            reasons: parse_json(&reasons, "reasons")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    })
    .transpose()
}
