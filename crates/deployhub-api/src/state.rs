//! Application state shared across all handlers.

use std::sync::Arc;

use deployhub_core::config::AppConfig;
use deployhub_core::traits::queue::TaskQueue;
use deployhub_service::{DeploymentService, ProjectService};
use deployhub_storage::ArtifactStore;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Upload and deployment reads
    pub deployment_service: Arc<DeploymentService>,
    /// Project management
    pub project_service: Arc<ProjectService>,
    /// Task queue, probed by the health check
    pub queue: Arc<dyn TaskQueue>,
    /// Artifact storage, probed by the health check
    pub storage: Arc<ArtifactStore>,
}
