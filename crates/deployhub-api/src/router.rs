//! Route definitions for the DeployHub HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
///
/// The request body limit comes from `storage.max_upload_size_bytes`, so
/// oversized uploads are rejected before they reach the service.
pub fn build_router(state: AppState) -> Router {
    let max_upload =
        usize::try_from(state.config.storage.max_upload_size_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(deployment_routes())
        .merge(project_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Upload and deployment reads
fn deployment_routes() -> Router<AppState> {
    Router::new()
        .route("/deployments", get(handlers::deployment::list))
        .route("/deployments/upload", post(handlers::deployment::upload))
        .route("/deployments/{id}", get(handlers::deployment::get))
}

/// Project CRUD
fn project_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects",
            get(handlers::project::list).post(handlers::project::create),
        )
        .route(
            "/projects/{id}",
            get(handlers::project::get)
                .put(handlers::project::rename)
                .delete(handlers::project::delete),
        )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
