//! Re-rendering a project's gateway file from the database.

use std::sync::Arc;

use tracing::{debug, info};

use deployhub_core::config::GatewayConfig;
use deployhub_core::result::AppResult;
use deployhub_core::types::{PageRequest, ProjectId};
use deployhub_database::store::{DeploymentStore, ProjectStore};
use deployhub_entity::deployment::{DeploymentFilter, GatewayRoute};

use crate::hostname;
use crate::writer::GatewayConfigWriter;

/// Recomputes a project's routes from its `ready` deployments and hands
/// them to the configured writer.
///
/// Every call performs a fresh query, so concurrent regenerations for the
/// same project converge on the latest database state.
#[derive(Debug, Clone)]
pub struct GatewaySync {
    deployments: Arc<dyn DeploymentStore>,
    projects: Arc<dyn ProjectStore>,
    writer: Arc<dyn GatewayConfigWriter>,
    domain: String,
    scheme: String,
}

impl GatewaySync {
    /// Create a new synchronizer.
    pub fn new(
        deployments: Arc<dyn DeploymentStore>,
        projects: Arc<dyn ProjectStore>,
        writer: Arc<dyn GatewayConfigWriter>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            deployments,
            projects,
            writer,
            domain: config.domain.clone(),
            scheme: config.scheme.clone(),
        }
    }

    /// Underlying writer.
    pub fn writer(&self) -> &Arc<dyn GatewayConfigWriter> {
        &self.writer
    }

    /// Public URL a deployment is reachable at once ready.
    pub fn public_url(&self, content_hash: &str, project_name: &str) -> String {
        hostname::public_url(&self.scheme, content_hash, project_name, &self.domain)
    }

    /// All `ready` deployments of a project as routes, across every page.
    pub async fn ready_routes(
        &self,
        project_id: ProjectId,
        project_name: &str,
    ) -> AppResult<Vec<GatewayRoute>> {
        let filter = DeploymentFilter::ready_in(project_id);
        let mut page = PageRequest::first_max();
        let mut routes = Vec::new();

        loop {
            let batch = self.deployments.get_paged(&filter, &page).await?;
            routes.extend(
                batch
                    .items
                    .iter()
                    .map(|d| GatewayRoute::from_deployment(d, project_name)),
            );
            if !batch.has_next {
                break;
            }
            page = page.next();
        }

        Ok(routes)
    }

    /// Rewrite (or remove) the project's file. Returns the route count.
    pub async fn regenerate(&self, project_id: ProjectId) -> AppResult<usize> {
        let Some(project) = self.projects.get_by_id(project_id).await? else {
            debug!(%project_id, "Project gone, removing gateway config");
            self.writer.remove_project_config(project_id).await?;
            return Ok(0);
        };

        let routes = self.ready_routes(project_id, &project.name).await?;
        self.writer
            .write_project_config(project_id, &project.name, &routes)
            .await?;

        info!(%project_id, routes = routes.len(), "Gateway config regenerated");
        Ok(routes.len())
    }

    /// Drop the project's file.
    pub async fn remove(&self, project_id: ProjectId) -> AppResult<()> {
        self.writer.remove_project_config(project_id).await
    }
}
