//! Profile API handlers
//!
//! POST /profiles, GET /profiles/:id and the read-only enrichment views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{EnrichmentLogRecord, Profile, ProfileEnrichmentRecord, ProfileMetadataRecord};
use crate::types::TriggerType;
use crate::AppState;

/// POST /profiles request
///
/// Same shape as [`Profile`] with an optional id.
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Profile fields accepted at signup
#[derive(Debug, Default, Deserialize)]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub headline: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub website_urls: Vec<String>,
    pub avatar_url: Option<String>,
    pub public_enrichment_consent: Option<String>,
}

/// POST /profiles response
#[derive(Debug, Serialize)]
pub struct CreateProfileResponse {
    pub id: String,
    /// False when the initial run could not be queued
    pub enrichment_queued: bool,
}

/// POST /profiles
///
/// Signup: stores the profile and queues an `initial` enrichment run.
pub async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<CreateProfileResponse>)> {
    if let Some(consent) = request.profile.public_enrichment_consent.as_deref() {
        if consent != "yes" && consent != "no" {
            return Err(ApiError::BadRequest(format!(
                "public_enrichment_consent must be \"yes\" or \"no\", got {:?}",
                consent
            )));
        }
    }

    let id = match request.id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        Some(_) => return Err(ApiError::BadRequest("id must not be blank".to_string())),
        None => Uuid::new_v4().to_string(),
    };

    if db::profiles::load_profile(&state.db, &id).await?.is_some() {
        return Err(ApiError::Conflict(format!("profile {} already exists", id)));
    }

    let f = request.profile;
    let profile = Profile {
        id: id.clone(),
        first_name: f.first_name,
        last_name: f.last_name,
        email: f.email,
        headline: f.headline,
        title: f.title,
        company: f.company,
        location: f.location,
        bio: f.bio,
        skills: f.skills,
        industries: f.industries,
        interests: f.interests,
        linkedin_url: f.linkedin_url,
        twitter_url: f.twitter_url,
        github_url: f.github_url,
        website_urls: f.website_urls,
        avatar_url: f.avatar_url,
        public_enrichment_consent: f.public_enrichment_consent,
    };

    db::profiles::insert_profile(&state.db, &profile).await?;

    let enrichment_queued = match state.queue.enqueue(id.clone(), TriggerType::Initial) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(user_id = %id, error = %e, "Initial enrichment not queued");
            false
        }
    };

    tracing::info!(user_id = %id, enrichment_queued, "Profile created");

    Ok((
        StatusCode::CREATED,
        Json(CreateProfileResponse {
            id,
            enrichment_queued,
        }),
    ))
}

/// GET /profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Profile>> {
    db::profiles::load_profile(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("profile {}", id)))
}

/// GET /profiles/:id/enrichments
pub async fn list_enrichments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ProfileEnrichmentRecord>>> {
    ensure_profile(&state, &id).await?;
    Ok(Json(
        db::enrichments::list_profile_enrichments(&state.db, &id).await?,
    ))
}

/// GET /profiles/:id/enrichment-logs
pub async fn list_enrichment_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EnrichmentLogRecord>>> {
    ensure_profile(&state, &id).await?;
    Ok(Json(
        db::enrichment_logs::list_enrichment_logs(&state.db, &id).await?,
    ))
}

/// GET /profiles/:id/metadata
pub async fn list_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ProfileMetadataRecord>>> {
    ensure_profile(&state, &id).await?;
    Ok(Json(db::metadata::list_profile_metadata(&state.db, &id).await?))
}

/// GET /profiles/:id/trust-signals
///
/// Returns `{}` when the user has no trust-signal row yet.
pub async fn get_trust_signals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_profile(&state, &id).await?;
    let signals = db::trust_signals::load_trust_signals(&state.db, &id)
        .await?
        .unwrap_or_else(|| serde_json::json!({}));
    Ok(Json(signals))
}

async fn ensure_profile(state: &AppState, id: &str) -> ApiResult<()> {
    match db::profiles::load_profile(&state.db, id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("profile {}", id))),
    }
}

/// Build profile routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/:id", get(get_profile))
        .route("/profiles/:id/enrichments", get(list_enrichments))
        .route("/profiles/:id/enrichment-logs", get(list_enrichment_logs))
        .route("/profiles/:id/metadata", get(list_metadata))
        .route("/profiles/:id/trust-signals", get(get_trust_signals))
}
