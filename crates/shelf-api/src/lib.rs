//! # shelf-api
//!
//! HTTP layer for Shelf. Maps `GET /<path>` onto files under the storage
//! root and answers health checks.

pub mod middleware;
pub mod routes;

use axum::Router;
use shelf_fs::{AttributeNames, StorageRoot};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state available to all route handlers.
///
/// Read-only after startup; handlers never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub root: StorageRoot,
    /// Extended attribute names the upstream proxy writes.
    pub attributes: AttributeNames,
    /// Route answering health checks, if enabled.
    pub health_path: Option<String>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(root: StorageRoot, attributes: AttributeNames) -> Self {
        Self {
            root,
            attributes,
            health_path: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = Some(path.into());
        self
    }
}

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new().merge(routes::files::router());
    if let Some(path) = &state.health_path {
        router = router.merge(routes::health::router(path));
    }

    router
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
