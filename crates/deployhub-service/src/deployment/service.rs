//! Upload flow and deployment reads.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use validator::Validate;

use deployhub_core::config::DeploymentConfig;
use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::traits::queue::TaskQueue;
use deployhub_core::traits::storage::ByteStream;
use deployhub_core::types::{DeploymentId, PageRequest, PageResponse, ProjectId};
use deployhub_database::store::{DeploymentStore, ProjectStore};
use deployhub_entity::deployment::{
    CreateDeployment, Deployment, DeploymentFilter, DeploymentStatus, DeploymentTask,
    UpdateDeploymentStatus,
};
use deployhub_storage::{ArtifactKey, ArtifactStore};

use crate::validation::{normalize_entry_path, validate};

/// Parameters of a single archive upload. The archive body travels
/// separately as a [`ByteStream`].
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadParams {
    /// Owning project.
    pub project_id: ProjectId,
    /// Content hash; names the storage directory.
    #[validate(length(min = 1, message = "Content hash is required"))]
    pub content_hash: String,
    /// Path inside the artifact to serve. Blank serves the root.
    #[validate(length(max = 1024))]
    pub entry_path: Option<String>,
    /// Original file name; its extension selects the archive format.
    #[validate(length(min = 1, max = 255))]
    pub archive_name: String,
    /// Lifetime override in days. `Some(0)` never expires.
    #[validate(range(max = 3650))]
    pub ttl_days: Option<u32>,
}

/// Accepts uploads and serves deployment reads.
#[derive(Clone)]
pub struct DeploymentService {
    /// Deployment persistence.
    deployments: Arc<dyn DeploymentStore>,
    /// Project persistence.
    projects: Arc<dyn ProjectStore>,
    /// Artifact storage engine.
    storage: Arc<ArtifactStore>,
    /// Queue the worker consumes.
    queue: Arc<dyn TaskQueue>,
    /// Name of the deployment queue.
    queue_name: String,
    /// Lifecycle defaults.
    config: DeploymentConfig,
}

impl std::fmt::Debug for DeploymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentService")
            .field("queue_name", &self.queue_name)
            .finish()
    }
}

impl DeploymentService {
    /// Creates a new deployment service.
    pub fn new(
        deployments: Arc<dyn DeploymentStore>,
        projects: Arc<dyn ProjectStore>,
        storage: Arc<ArtifactStore>,
        queue: Arc<dyn TaskQueue>,
        queue_name: impl Into<String>,
        config: DeploymentConfig,
    ) -> Self {
        Self {
            deployments,
            projects,
            storage,
            queue,
            queue_name: queue_name.into(),
            config,
        }
    }

    /// Accept an archive upload.
    ///
    /// All validation happens before any side effect. The returned record is
    /// still `pending`; the worker decides between `ready` and `error`.
    pub async fn upload(&self, params: UploadParams, archive: ByteStream) -> AppResult<Deployment> {
        // Hostnames are case-insensitive, so the stored hash is lowercase.
        let params = UploadParams {
            content_hash: params.content_hash.trim().to_ascii_lowercase(),
            ..params
        };
        validate(&params)?;
        if params.content_hash.len() > self.config.max_content_hash_length {
            return Err(AppError::validation(format!(
                "Content hash exceeds {} characters",
                self.config.max_content_hash_length
            )));
        }
        let key = ArtifactKey::new(params.project_id, params.content_hash.clone())?;
        let entry_path = normalize_entry_path(params.entry_path.as_deref())?;

        self.projects
            .get_by_id(params.project_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Project {} not found", params.project_id)))?;

        let deployment = self
            .deployments
            .create(&CreateDeployment {
                project_id: params.project_id,
                content_hash: params.content_hash,
                entry_path,
                expires_at: self.expiry_from(Utc::now(), params.ttl_days),
            })
            .await?;

        info!(
            deployment_id = %deployment.id,
            project_id = %deployment.project_id,
            content_hash = %deployment.content_hash,
            archive = %params.archive_name,
            "Deployment created"
        );

        match self.storage.store(&key, &params.archive_name, archive).await {
            Ok(true) => debug!(deployment_id = %deployment.id, key = %key, "Artifact extracted"),
            Ok(false) => {
                info!(deployment_id = %deployment.id, key = %key, "Content already stored, extraction skipped")
            }
            Err(e) => {
                self.mark_failed(deployment.id, &e).await;
                return Err(e);
            }
        }

        let task = DeploymentTask {
            deployment_id: deployment.id,
            project_id: deployment.project_id,
            content_hash: deployment.content_hash.clone(),
        };
        if let Err(e) = self.enqueue(&task).await {
            self.mark_failed(deployment.id, &e).await;
            return Err(e);
        }

        debug!(deployment_id = %deployment.id, queue = %self.queue_name, "Deployment queued");
        Ok(deployment)
    }

    /// Fetch one deployment.
    pub async fn get(&self, id: DeploymentId) -> AppResult<Deployment> {
        self.deployments
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Deployment {id} not found")))
    }

    /// List deployments, newest first.
    pub async fn list(
        &self,
        filter: &DeploymentFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<Deployment>> {
        self.deployments.get_paged(filter, &page).await
    }

    fn expiry_from(&self, now: DateTime<Utc>, ttl_days: Option<u32>) -> Option<DateTime<Utc>> {
        match ttl_days.unwrap_or(self.config.default_ttl_days) {
            0 => None,
            days => Some(now + Duration::days(i64::from(days))),
        }
    }

    async fn enqueue(&self, task: &DeploymentTask) -> AppResult<()> {
        let payload = serde_json::to_string(task)?;
        self.queue.push(&self.queue_name, &payload).await
    }

    /// Move a freshly created record to `error` so it does not linger as
    /// `pending`. Failures here are logged only.
    async fn mark_failed(&self, id: DeploymentId, cause: &AppError) {
        warn!(deployment_id = %id, error = %cause, "Upload failed after record creation");
        if let Err(e) = self
            .deployments
            .update_status(&UpdateDeploymentStatus::new(id, DeploymentStatus::Error))
            .await
        {
            warn!(deployment_id = %id, error = %e, "Could not mark failed upload as error");
        }
    }
}
