//! Persistence traits consumed by the services and background workers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use deployhub_core::result::AppResult;
use deployhub_core::types::{DeploymentId, PageRequest, PageResponse, ProjectId};
use deployhub_entity::deployment::{
    CreateDeployment, Deployment, DeploymentFilter, UpdateDeploymentStatus,
};
use deployhub_entity::project::{CreateProject, Project, UpdateProject};

/// Deployment persistence.
#[async_trait]
pub trait DeploymentStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a deployment by id, with its project name populated.
    async fn get_by_id(&self, id: DeploymentId) -> AppResult<Option<Deployment>>;

    /// List deployments matching `filter`, newest first.
    async fn get_paged(
        &self,
        filter: &DeploymentFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Deployment>>;

    /// Insert a new `pending` deployment.
    ///
    /// Fails with `NotFound` when the project does not exist.
    async fn create(&self, data: &CreateDeployment) -> AppResult<Deployment>;

    /// Apply a status change if it is a legal forward transition from the
    /// stored status.
    ///
    /// Fails with `NotFound` for an unknown id and `Conflict` when the
    /// stored status does not permit the change.
    async fn update_status(&self, update: &UpdateDeploymentStatus) -> AppResult<Deployment>;

    /// Non-expired deployments whose `expires_at` is at or before `now`,
    /// oldest expiry first, at most `limit` rows.
    async fn get_expired(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<Deployment>>;
}

/// Project persistence.
#[async_trait]
pub trait ProjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a project by id.
    async fn get_by_id(&self, id: ProjectId) -> AppResult<Option<Project>>;

    /// List projects ordered by name.
    async fn get_paged(&self, page: &PageRequest) -> AppResult<PageResponse<Project>>;

    /// Insert a project. Fails with `Conflict` on a duplicate name.
    async fn create(&self, data: &CreateProject) -> AppResult<Project>;

    /// Rename a project. Fails with `NotFound` or `Conflict`.
    async fn update(&self, id: ProjectId, data: &UpdateProject) -> AppResult<Project>;

    /// Delete a project and its deployment records. Returns `true` if a
    /// row was removed.
    async fn delete(&self, id: ProjectId) -> AppResult<bool>;
}
