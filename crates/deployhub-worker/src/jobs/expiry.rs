//! Expired deployment cleanup.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use deployhub_core::config::WorkerConfig;
use deployhub_core::error::ErrorKind;
use deployhub_core::result::AppResult;
use deployhub_core::types::PageRequest;
use deployhub_database::store::DeploymentStore;
use deployhub_entity::deployment::{
    Deployment, DeploymentFilter, DeploymentStatus, UpdateDeploymentStatus,
};
use deployhub_gateway::GatewaySync;
use deployhub_storage::{ArtifactKey, ArtifactStore};

use crate::scheduler::MaintenanceRunner;

/// Removes the artifacts of expired deployments, marks them `expired` and
/// re-renders the owning project's gateway file.
///
/// Stored bytes are shared by every deployment of a project with the same
/// content hash, so the tree is kept while a live sibling still uses it.
#[derive(Debug, Clone)]
pub struct ExpiryJob {
    deployments: Arc<dyn DeploymentStore>,
    storage: Arc<ArtifactStore>,
    gateway: GatewaySync,
    batch_size: u64,
}

impl ExpiryJob {
    /// Create a new expiry job.
    pub fn new(
        deployments: Arc<dyn DeploymentStore>,
        storage: Arc<ArtifactStore>,
        gateway: GatewaySync,
        batch_size: u64,
    ) -> Self {
        Self {
            deployments,
            storage,
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    /// Deployments due for expiry right now.
    pub async fn fetch_batch(&self) -> AppResult<Vec<Deployment>> {
        self.deployments
            .get_expired(Utc::now(), self.batch_size)
            .await
    }

    /// Expire one deployment.
    pub async fn expire(&self, deployment: &Deployment) -> AppResult<()> {
        let now = Utc::now();

        match ArtifactKey::for_deployment(deployment) {
            Ok(key) => {
                if self.has_live_sibling(deployment, now).await? {
                    info!(
                        deployment_id = %deployment.id,
                        key = %key,
                        "Artifact still referenced by a live deployment, keeping files"
                    );
                } else {
                    self.storage.remove(key.as_str()).await?;
                    debug!(deployment_id = %deployment.id, key = %key, "Removed artifact");
                }
            }
            Err(e) => {
                warn!(deployment_id = %deployment.id, error = %e, "No valid storage key, nothing to remove");
            }
        }

        let update = UpdateDeploymentStatus::new(deployment.id, DeploymentStatus::Expired);
        match self.deployments.update_status(&update).await {
            Ok(_) => {}
            Err(e) if e.kind == ErrorKind::Conflict => {
                debug!(deployment_id = %deployment.id, "Deployment already expired");
            }
            Err(e) => return Err(e),
        }

        self.gateway.regenerate(deployment.project_id).await?;

        info!(
            deployment_id = %deployment.id,
            project_id = %deployment.project_id,
            "Deployment expired"
        );
        Ok(())
    }

    /// Whether another deployment of the same project and content hash is
    /// still live and not itself past expiry.
    async fn has_live_sibling(&self, deployment: &Deployment, now: DateTime<Utc>) -> AppResult<bool> {
        let filter = DeploymentFilter {
            project_id: Some(deployment.project_id),
            status: None,
            content_hash: Some(deployment.content_hash.clone()),
        };
        let mut page = PageRequest::first_max();

        loop {
            let batch = self.deployments.get_paged(&filter, &page).await?;
            if batch.items.iter().any(|d| {
                d.id != deployment.id && d.status.is_live() && !d.is_expired_at(now)
            }) {
                return Ok(true);
            }
            if !batch.has_next {
                return Ok(false);
            }
            page = page.next();
        }
    }

    /// Wrap the job in a periodic runner configured from `config`.
    pub fn into_runner(self, config: &WorkerConfig) -> MaintenanceRunner<Deployment> {
        let job = Arc::new(self);
        let fetcher = Arc::clone(&job);

        MaintenanceRunner::new(
            "expiry_cleanup",
            Duration::from_secs(config.expiry_interval_seconds),
            config.expiry_concurrency,
            move || {
                let job = Arc::clone(&fetcher);
                async move { job.fetch_batch().await }
            },
            move |deployment: Deployment| {
                let job = Arc::clone(&job);
                async move { job.expire(&deployment).await }
            },
        )
        .with_item_timeout(Duration::from_secs(config.expiry_item_timeout_seconds))
        .with_error_handler(|deployment, err| {
            tracing::error!(
                deployment_id = %deployment.id,
                error = %err,
                "Deployment cleanup failed"
            );
        })
    }
}
