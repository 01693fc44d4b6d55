use axum::extract::State;
use axum::{routing::get, Json, Router};
use fundbridge_engine::store::FundingStore;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store is unreachable.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub store_healthy: bool,
}

/// GET /health
async fn health_check<S: FundingStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let store_healthy = state.engine.store().ping().await.is_ok();
    let status = if store_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store_healthy,
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router<S: FundingStore>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health_check::<S>))
}
