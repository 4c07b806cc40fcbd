//! Background consumer and maintenance configuration.

use serde::{Deserialize, Serialize};

/// Deployment consumer and expiry scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the background loops run in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Admission gate size for concurrently processed deployment tasks.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,
    /// Deadline for a single deployment task, in seconds.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_seconds: u64,
    /// Interval between expiry sweeps, in seconds.
    #[serde(default = "default_expiry_interval")]
    pub expiry_interval_seconds: u64,
    /// Concurrency cap for expiry cleanup.
    #[serde(default = "default_expiry_concurrency")]
    pub expiry_concurrency: usize,
    /// Deadline for cleaning up one expired deployment, in seconds.
    #[serde(default = "default_expiry_item_timeout")]
    pub expiry_item_timeout_seconds: u64,
    /// Maximum number of expired deployments handled per sweep.
    #[serde(default = "default_expiry_batch_size")]
    pub expiry_batch_size: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_tasks: default_max_concurrent(),
            task_timeout_seconds: default_task_timeout(),
            expiry_interval_seconds: default_expiry_interval(),
            expiry_concurrency: default_expiry_concurrency(),
            expiry_item_timeout_seconds: default_expiry_item_timeout(),
            expiry_batch_size: default_expiry_batch_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    50
}

fn default_task_timeout() -> u64 {
    300
}

fn default_expiry_interval() -> u64 {
    3600
}

fn default_expiry_concurrency() -> usize {
    5
}

fn default_expiry_item_timeout() -> u64 {
    120
}

fn default_expiry_batch_size() -> u64 {
    500
}
