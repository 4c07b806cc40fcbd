//! Task queue configuration.

use serde::{Deserialize, Serialize};

/// Top-level queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue provider: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Logical name of the deployment task list.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Blocking-pop timeout in seconds. Bounds how quickly the consumer
    /// notices cancellation.
    #[serde(default = "default_pop_timeout")]
    pub pop_timeout_seconds: u64,
    /// Redis backend settings.
    #[serde(default)]
    pub redis: RedisQueueConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            queue_name: default_queue_name(),
            pop_timeout_seconds: default_pop_timeout(),
            redis: RedisQueueConfig::default(),
        }
    }
}

/// Redis queue backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix for every key DeployHub writes.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_queue_name() -> String {
    "deployments".to_string()
}

fn default_pop_timeout() -> u64 {
    1
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "deployhub:".to_string()
}
