//! Administrative endpoints for introspection and reset.
//!
//! Mounted outside the rate-limited surface so operators can always reach
//! them. Reset exists for administrative tooling and for clearing state
//! between test scenarios.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ratelimit::{RateLimitBackend, RateLimitStats};

/// Build the admin router over a shared backend.
pub fn admin_router(limiter: Arc<dyn RateLimitBackend>) -> Router {
    Router::new()
        .route("/ratelimit/stats", get(stats))
        .route("/ratelimit/reset", post(reset))
        .with_state(limiter)
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: RateLimitStats,
    generated_at: DateTime<Utc>,
}

async fn stats(State(limiter): State<Arc<dyn RateLimitBackend>>) -> Json<StatsResponse> {
    let stats = limiter.stats().await;
    Json(StatsResponse {
        stats,
        generated_at: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    identity: String,
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    success: bool,
    removed: usize,
}

async fn reset(
    State(limiter): State<Arc<dyn RateLimitBackend>>,
    Json(request): Json<ResetRequest>,
) -> Json<ResetResponse> {
    let removed = limiter
        .reset(&request.identity, request.path.as_deref())
        .await;
    info!(identity = %request.identity, removed = removed, "Admin reset");
    Json(ResetResponse {
        success: true,
        removed,
    })
}
