//! # deployhub-api
//!
//! HTTP API layer for DeployHub built on Axum.
//!
//! Provides the upload, deployment read, project and health endpoints,
//! request logging, DTOs, and the mapping from `AppError` to HTTP
//! responses.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
