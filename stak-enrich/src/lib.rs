//! stak-enrich library interface
//!
//! Profile enrichment pipeline, persistence, background queue and HTTP surface.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{EnrichmentQueue, MatchScorer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Background enrichment queue
    pub queue: EnrichmentQueue,
    pub match_scorer: Arc<MatchScorer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, queue: EnrichmentQueue, match_scorer: Arc<MatchScorer>) -> Self {
        Self {
            db,
            queue,
            match_scorer,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::profile_routes())
        .merge(api::enrichment_routes())
        .merge(api::match_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
