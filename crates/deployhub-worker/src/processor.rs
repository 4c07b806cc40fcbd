//! Per-task deployment processing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use deployhub_core::error::ErrorKind;
use deployhub_database::store::DeploymentStore;
use deployhub_entity::deployment::{
    Deployment, DeploymentStatus, DeploymentTask, UpdateDeploymentStatus,
};
use deployhub_gateway::GatewaySync;
use deployhub_storage::{ArtifactKey, ArtifactStore};

use crate::error::TaskError;
use crate::handler::TaskHandler;

/// Result of processing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The deployment is now `ready` and routed.
    Ready,
    /// The deployment was marked `error`.
    Failed(String),
    /// The deployment was not `pending`; nothing to do.
    Skipped(DeploymentStatus),
}

/// Validates an extracted artifact, moves the record to `ready` or
/// `error`, and re-renders the project's gateway file.
#[derive(Debug, Clone)]
pub struct DeploymentProcessor {
    deployments: Arc<dyn DeploymentStore>,
    storage: Arc<ArtifactStore>,
    gateway: GatewaySync,
    require_entry_path: bool,
}

impl DeploymentProcessor {
    /// Create a new processor.
    pub fn new(
        deployments: Arc<dyn DeploymentStore>,
        storage: Arc<ArtifactStore>,
        gateway: GatewaySync,
        require_entry_path: bool,
    ) -> Self {
        Self {
            deployments,
            storage,
            gateway,
            require_entry_path,
        }
    }

    /// Process one task.
    pub async fn process(&self, task: &DeploymentTask) -> Result<ProcessOutcome, TaskError> {
        let deployment = self
            .deployments
            .get_by_id(task.deployment_id)
            .await?
            .ok_or(TaskError::NotFound(task.deployment_id))?;

        if deployment.status != DeploymentStatus::Pending {
            info!(
                deployment_id = %deployment.id,
                status = %deployment.status,
                "Deployment already processed, skipping"
            );
            return Ok(ProcessOutcome::Skipped(deployment.status));
        }

        info!(
            deployment_id = %deployment.id,
            project_id = %deployment.project_id,
            entry_path = deployment.entry_path.as_deref().unwrap_or(""),
            "Processing deployment"
        );

        if let Some(reason) = self.validate(&deployment).await {
            warn!(deployment_id = %deployment.id, reason = %reason, "Deployment failed validation");
            self.mark_error(&deployment).await?;
            return Ok(ProcessOutcome::Failed(reason));
        }

        let project_name = deployment.project_name.clone().unwrap_or_default();
        let update = UpdateDeploymentStatus {
            id: deployment.id,
            status: DeploymentStatus::Ready,
            public_url: Some(
                self.gateway
                    .public_url(&deployment.content_hash, &project_name),
            ),
        };
        self.deployments.update_status(&update).await?;

        self.gateway.regenerate(deployment.project_id).await?;

        info!(deployment_id = %deployment.id, "Deployment ready");
        Ok(ProcessOutcome::Ready)
    }

    /// Reason the deployment cannot go live, if any.
    async fn validate(&self, deployment: &Deployment) -> Option<String> {
        let key = match ArtifactKey::for_deployment(deployment) {
            Ok(key) => key,
            Err(e) => return Some(e.message),
        };

        let entry = deployment
            .entry_path
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        match entry {
            None if self.require_entry_path => {
                Some("entry_path is required but was not provided at upload".to_string())
            }
            None => (!self.storage.exists(key.as_str()).await)
                .then(|| format!("artifact {key} is missing from storage")),
            Some(entry) => (!self.storage.exists(&key.join(entry)).await)
                .then(|| format!("entry_path '{entry}' not found in extracted archive")),
        }
    }

    async fn mark_error(&self, deployment: &Deployment) -> Result<(), TaskError> {
        let update = UpdateDeploymentStatus::new(deployment.id, DeploymentStatus::Error);
        match self.deployments.update_status(&update).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind == ErrorKind::Conflict => {
                warn!(deployment_id = %deployment.id, error = %e, "Status changed concurrently");
                Ok(())
            }
            Err(e) => {
                error!(deployment_id = %deployment.id, error = %e, "Failed to mark deployment as error");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl TaskHandler for DeploymentProcessor {
    async fn handle(&self, task: DeploymentTask) -> Result<ProcessOutcome, TaskError> {
        self.process(&task).await
    }
}
