//! Deployment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use deployhub_core::types::{DeploymentId, ProjectId};

use super::status::DeploymentStatus;

/// A single uploaded build artifact and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Deployment {
    /// Unique deployment identifier.
    pub id: DeploymentId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Content-addressable identifier; with `project_id` it names the
    /// storage location.
    pub content_hash: String,
    /// Current lifecycle status.
    pub status: DeploymentStatus,
    /// Path inside the artifact to serve (`None` = artifact root).
    pub entry_path: Option<String>,
    /// Public URL, set once the deployment is ready.
    pub public_url: Option<String>,
    /// When the deployment was uploaded.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
    /// Expiry instant (`None` = never expires).
    pub expires_at: Option<DateTime<Utc>>,
    /// Project name joined from `projects`.
    #[sqlx(default)]
    pub project_name: Option<String>,
}

impl Deployment {
    /// Storage key relative to the storage base directory.
    pub fn storage_key(&self) -> String {
        storage_key(self.project_id, &self.content_hash)
    }

    /// Whether the deployment is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Build the storage key for a project/content-hash pair.
pub fn storage_key(project_id: ProjectId, content_hash: &str) -> String {
    format!("deployments/{project_id}/{content_hash}")
}

/// Data required to create a deployment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeployment {
    /// Owning project.
    pub project_id: ProjectId,
    /// Content hash supplied by the uploader.
    pub content_hash: String,
    /// Normalized entry path.
    pub entry_path: Option<String>,
    /// Expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A guarded status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDeploymentStatus {
    /// Deployment to update.
    pub id: DeploymentId,
    /// Target status.
    pub status: DeploymentStatus,
    /// Public URL to record alongside the change.
    pub public_url: Option<String>,
}

impl UpdateDeploymentStatus {
    /// Status change without a URL.
    pub fn new(id: DeploymentId, status: DeploymentStatus) -> Self {
        Self {
            id,
            status,
            public_url: None,
        }
    }
}

/// Filters for paged deployment queries. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentFilter {
    /// Restrict to one project.
    pub project_id: Option<ProjectId>,
    /// Restrict to one status.
    pub status: Option<DeploymentStatus>,
    /// Restrict to one content hash.
    pub content_hash: Option<String>,
}

impl DeploymentFilter {
    /// Ready deployments of one project.
    pub fn ready_in(project_id: ProjectId) -> Self {
        Self {
            project_id: Some(project_id),
            status: Some(DeploymentStatus::Ready),
            content_hash: None,
        }
    }

    /// Whether `deployment` satisfies every set field.
    pub fn matches(&self, deployment: &Deployment) -> bool {
        self.project_id.is_none_or(|p| p == deployment.project_id)
            && self.status.is_none_or(|s| s == deployment.status)
            && self
                .content_hash
                .as_deref()
                .is_none_or(|h| h == deployment.content_hash)
    }
}
