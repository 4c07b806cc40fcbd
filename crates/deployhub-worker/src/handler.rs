//! Handler seam between the consumer loop and task processing.

use async_trait::async_trait;

use deployhub_entity::deployment::DeploymentTask;

use crate::error::TaskError;
use crate::processor::ProcessOutcome;

/// Processes one decoded deployment task.
#[async_trait]
pub trait TaskHandler: Send + Sync + std::fmt::Debug + 'static {
    /// Handle the task to completion.
    async fn handle(&self, task: DeploymentTask) -> Result<ProcessOutcome, TaskError>;
}
