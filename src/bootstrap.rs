//! Wiring of the pipeline components.

use std::sync::Arc;

use tracing::info;

use deployhub_api::AppState;
use deployhub_core::config::AppConfig;
use deployhub_core::result::AppResult;
use deployhub_core::traits::queue::TaskQueue;
use deployhub_database::store::{DeploymentStore, ProjectStore};
use deployhub_entity::deployment::Deployment;
use deployhub_gateway::{GatewaySync, build_gateway};
use deployhub_service::{DeploymentService, ProjectService};
use deployhub_storage::ArtifactStore;
use deployhub_worker::{DeploymentConsumer, DeploymentProcessor, ExpiryJob, MaintenanceRunner};

/// Everything the server runs: HTTP state plus the two background loops.
#[derive(Debug)]
pub struct Components {
    /// Shared state for the HTTP router.
    pub state: AppState,
    /// Deployment queue consumer.
    pub consumer: DeploymentConsumer,
    /// Periodic expiry cleanup.
    pub expiry: MaintenanceRunner<Deployment>,
}

/// Build all components over the given persistence and queue backends.
pub async fn assemble(
    config: Arc<AppConfig>,
    deployments: Arc<dyn DeploymentStore>,
    projects: Arc<dyn ProjectStore>,
    queue: Arc<dyn TaskQueue>,
) -> AppResult<Components> {
    let storage = Arc::new(ArtifactStore::new(&config.storage).await?);
    info!(base_dir = %storage.base_dir().display(), "Artifact storage ready");

    let writer = build_gateway(&config.gateway);
    info!(
        provider = %config.gateway.provider,
        config_dir = %config.gateway.config_dir,
        domain = %config.gateway.domain,
        "Gateway generator ready"
    );
    let gateway = GatewaySync::new(
        deployments.clone(),
        projects.clone(),
        writer,
        &config.gateway,
    );

    let deployment_service = Arc::new(DeploymentService::new(
        deployments.clone(),
        projects.clone(),
        storage.clone(),
        queue.clone(),
        config.queue.queue_name.clone(),
        config.deployment.clone(),
    ));
    let project_service = Arc::new(ProjectService::new(
        projects,
        deployments.clone(),
        storage.clone(),
        gateway.clone(),
    ));

    let processor = DeploymentProcessor::new(
        deployments.clone(),
        storage.clone(),
        gateway.clone(),
        config.gateway.require_entry_path,
    );
    let consumer = DeploymentConsumer::new(
        queue.clone(),
        Arc::new(processor),
        &config.queue,
        &config.worker,
    );

    let expiry = ExpiryJob::new(
        deployments,
        storage.clone(),
        gateway,
        config.worker.expiry_batch_size,
    )
    .into_runner(&config.worker);

    let state = AppState {
        config,
        deployment_service,
        project_service,
        queue,
        storage,
    };

    Ok(Components {
        state,
        consumer,
        expiry,
    })
}
