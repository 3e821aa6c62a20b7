//! HTTP router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use graphsplit_core::config::ServerConfig;
use graphsplit_store::Store;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router<S: Store>(state: Arc<AppState<S>>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/jobs", post(api::jobs::upload_job::<S>).get(api::jobs::list_jobs::<S>))
        .route("/api/jobs/{id}", get(api::jobs::get_job::<S>))
        .route("/api/jobs/{id}/download", get(api::jobs::download_job::<S>))
        .route("/api/jobs/{id}/tasks", get(api::jobs::list_job_tasks::<S>))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new().allow_origin(value).allow_methods(Any).allow_headers(Any),
        Err(e) => {
            warn!(origin, error = %e, "invalid CORS origin, falling back to permissive");
            CorsLayer::permissive()
        }
    }
}
