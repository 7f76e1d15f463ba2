//! Health check endpoint — for load balancers, monitoring, and Docker health checks.
//!
//! Mounted on a reserved path (default `/_shelf/health`) because every other
//! path belongs to the file namespace.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

/// Health check router.
pub fn router(path: &str) -> Router<Arc<AppState>> {
    Router::new().route(path, get(health_check))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    // The root may have been unmounted or removed underneath us
    let root_ok = tokio::fs::metadata(state.root.path())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    Json(HealthResponse {
        status: if root_ok {
            "healthy".into()
        } else {
            "degraded".into()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
