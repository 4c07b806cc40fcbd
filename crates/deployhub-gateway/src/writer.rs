//! Gateway writer abstraction.

use std::path::PathBuf;

use async_trait::async_trait;

use deployhub_core::config::GatewayProvider;
use deployhub_core::result::AppResult;
use deployhub_core::types::ProjectId;
use deployhub_entity::deployment::GatewayRoute;

/// Emits one configuration file per project for an external proxy.
#[async_trait]
pub trait GatewayConfigWriter: Send + Sync + std::fmt::Debug + 'static {
    /// Proxy flavour this writer targets.
    fn provider(&self) -> GatewayProvider;

    /// Path of the file owned by `project_id`.
    fn config_path(&self, project_id: ProjectId) -> PathBuf;

    /// Render `routes` and atomically replace the project's file. An empty
    /// route set removes the file instead.
    async fn write_project_config(
        &self,
        project_id: ProjectId,
        project_name: &str,
        routes: &[GatewayRoute],
    ) -> AppResult<()>;

    /// Delete the project's file. Missing files are fine.
    async fn remove_project_config(&self, project_id: ProjectId) -> AppResult<()>;
}

/// Copy and sort routes so rendering does not depend on query order.
pub(crate) fn sorted(routes: &[GatewayRoute]) -> Vec<&GatewayRoute> {
    let mut sorted: Vec<&GatewayRoute> = routes.iter().collect();
    sorted.sort();
    sorted
}
