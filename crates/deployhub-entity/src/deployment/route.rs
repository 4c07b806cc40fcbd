//! Gateway route value object.

use serde::{Deserialize, Serialize};

use deployhub_core::types::{DeploymentId, ProjectId};

use super::model::Deployment;

/// One `ready` deployment as the reverse proxy sees it.
///
/// Routes are recomputed from the database on every regeneration and are
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GatewayRoute {
    /// Content hash; the leading hostname label.
    pub content_hash: String,
    /// Deployment the route belongs to.
    pub deployment_id: DeploymentId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Project name used in the hostname.
    pub project_name: String,
    /// Entry path inside the artifact (`None` = root).
    pub entry_path: Option<String>,
}

impl GatewayRoute {
    /// Build a route from a deployment, falling back to `project_name` when
    /// the record carries no joined name.
    pub fn from_deployment(deployment: &Deployment, project_name: &str) -> Self {
        Self {
            content_hash: deployment.content_hash.clone(),
            deployment_id: deployment.id,
            project_id: deployment.project_id,
            project_name: deployment
                .project_name
                .clone()
                .unwrap_or_else(|| project_name.to_string()),
            entry_path: deployment.entry_path.clone(),
        }
    }
}
