//! Match scoring endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::MatchScoreRecord;
use crate::AppState;

/// POST /matches/score request
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub user_a: String,
    pub user_b: String,
}

/// POST /matches/score
pub async fn score_match(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<MatchScoreRecord>> {
    if request.user_a == request.user_b {
        return Err(ApiError::BadRequest(
            "cannot score a profile against itself".to_string(),
        ));
    }

    let record = state
        .match_scorer
        .score(&request.user_a, &request.user_b)
        .await?;
    Ok(Json(record))
}

/// Build match routes
pub fn match_routes() -> Router<AppState> {
    Router::new().route("/matches/score", post(score_match))
}
