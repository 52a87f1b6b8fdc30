//! Re-enrichment action
//!
//! POST /profiles/:id/enrich queues a run and returns 202 without waiting.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::types::TriggerType;
use crate::AppState;

/// POST /profiles/:id/enrich request
#[derive(Debug, Default, Deserialize)]
pub struct EnrichRequest {
    #[serde(default)]
    pub trigger: Option<TriggerType>,
}

/// POST /profiles/:id/enrich response
#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub user_id: String,
    pub trigger: TriggerType,
    pub queued: bool,
}

/// POST /profiles/:id/enrich
///
/// Body is optional; the trigger defaults to `refresh`. The consent gate is
/// applied by the pipeline, so a refused run still shows up in the logs.
pub async fn request_enrichment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<EnrichRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EnrichResponse>)> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => EnrichRequest::default(),
        Err(e) => return Err(ApiError::BadRequest(e.body_text())),
    };
    let trigger = request.trigger.unwrap_or(TriggerType::Refresh);

    if db::profiles::load_profile(&state.db, &id).await?.is_none() {
        return Err(ApiError::NotFound(format!("profile {}", id)));
    }

    state.queue.enqueue(id.clone(), trigger)?;
    tracing::info!(user_id = %id, trigger = %trigger, "Enrichment queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(EnrichResponse {
            user_id: id,
            trigger,
            queued: true,
        }),
    ))
}

/// Build enrichment routes
pub fn enrichment_routes() -> Router<AppState> {
    Router::new().route("/profiles/:id/enrich", post(request_enrichment))
}
