//! Profile database operations
//!
//! The pipeline only reads profiles. Inserts come from the signup route.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use stak_common::{Error, Result};

use super::parse_json;
use crate::models::Profile;

/// Insert a new profile
pub async fn insert_profile(pool: &SqlitePool, profile: &Profile) -> Result<()> {
    let skills = serde_json::to_string(&profile.skills)?;
    let industries = serde_json::to_string(&profile.industries)?;
    let interests = serde_json::to_string(&profile.interests)?;
    let website_urls = serde_json::to_string(&profile.website_urls)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO profiles (
            id, first_name, last_name, email, headline, title, company,
            location, bio, skills, industries, interests, linkedin_url,
            twitter_url, github_url, website_urls, avatar_url,
            public_enrichment_consent, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&profile.id)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.email)
    .bind(&profile.headline)
    .bind(&profile.title)
    .bind(&profile.company)
    .bind(&profile.location)
    .bind(&profile.bio)
    .bind(&skills)
    .bind(&industries)
    .bind(&interests)
    .bind(&profile.linkedin_url)
    .bind(&profile.twitter_url)
    .bind(&profile.github_url)
    .bind(&website_urls)
    .bind(&profile.avatar_url)
    .bind(&profile.public_enrichment_consent)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Load a profile by id
pub async fn load_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, first_name, last_name, email, headline, title, company,
               location, bio, skills, industries, interests, linkedin_url,
               twitter_url, github_url, website_urls, avatar_url,
               public_enrichment_consent
        FROM profiles
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let skills: String = row.get("skills");
    let industries: String = row.get("industries");
    let interests: String = row.get("interests");
    let website_urls: String = row.get("website_urls");

    Ok(Some(Profile {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        headline: row.get("headline"),
        title: row.get("title"),
        company: row.get("company"),
        location: row.get("location"),
        bio: row.get("bio"),
        skills: parse_json(&skills, "skills")?,
        industries: parse_json(&industries, "industries")?,
        interests: parse_json(&interests, "interests")?,
        linkedin_url: row.get("linkedin_url"),
        twitter_url: row.get("twitter_url"),
        github_url: row.get("github_url"),
        website_urls: parse_json(&website_urls, "website_urls")?,
        avatar_url: row.get("avatar_url"),
        public_enrichment_consent: row.get("public_enrichment_consent"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_test_db;

    #[tokio::test]
    async fn test_insert_and_load_profile() {
        let pool = setup_test_db().await;
        let profile = Profile {
            id: "u1".into(),
            first_name: Some("Grace".into()),
            email: Some("grace@navy.mil".into()),
            skills: vec!["COBOL".into()],
            website_urls: vec!["https://grace.dev".into()],
            ..Default::default()
        };

        insert_profile(&pool, &profile).await.unwrap();
        let loaded = load_profile(&pool, "u1").await.unwrap().unwrap();

        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn test_load_missing_profile() {
        let pool = setup_test_db().await;
        assert!(load_profile(&pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let pool = setup_test_db().await;
        let profile = Profile {
            id: "dup".into(),
            ..Default::default()
        };

        insert_profile(&pool, &profile).await.unwrap();
        let err = insert_profile(&pool, &profile).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
