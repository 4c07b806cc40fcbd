//! Task failure taxonomy.

use std::time::Duration;

use deployhub_core::error::AppError;
use deployhub_core::types::DeploymentId;

/// Why a background task did not complete. Tasks are never retried; the
/// error is logged with the deployment id and the task is dropped.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The queue payload could not be decoded.
    #[error("Malformed task payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The deployment record no longer exists.
    #[error("Deployment {0} not found")]
    NotFound(DeploymentId),

    /// The task exceeded its deadline.
    #[error("Task timed out after {0:?}")]
    Timeout(Duration),

    /// Infrastructure failure (database, storage, gateway).
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}
