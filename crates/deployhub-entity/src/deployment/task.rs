//! Queue payload for deployment processing.

use serde::{Deserialize, Serialize};

use deployhub_core::types::{DeploymentId, ProjectId};

/// The message pushed onto the deployment queue after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTask {
    /// Deployment record to process.
    pub deployment_id: DeploymentId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Content hash the artifact was stored under.
    pub content_hash: String,
}

impl DeploymentTask {
    /// Decode a task from a raw queue payload.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
