//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_entity::deployment::{DeploymentFilter, DeploymentStatus};

use crate::extractors::parse_id;

/// Create or rename a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRequest {
    /// Project name (3-100 characters).
    pub name: String,
}

/// Filters accepted by `GET /api/deployments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DeploymentListQuery {
    /// Restrict to one project.
    pub project_id: Option<String>,
    /// One of `pending`, `ready`, `error`, `expired`.
    #[validate(length(min = 1, max = 16))]
    pub status: Option<String>,
    /// Restrict to one content hash.
    #[validate(length(min = 1, max = 128))]
    pub content_hash: Option<String>,
}

impl DeploymentListQuery {
    /// Parse into a repository filter.
    pub fn into_filter(self) -> AppResult<DeploymentFilter> {
        let project_id = self.project_id.as_deref().map(parse_id).transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| {
                s.parse::<DeploymentStatus>().map_err(|_| {
                    AppError::validation(format!(
                        "Invalid status '{s}'; expected pending, ready, error or expired"
                    ))
                })
            })
            .transpose()?;

        Ok(DeploymentFilter {
            project_id,
            status,
            content_hash: self.content_hash,
        })
    }
}
