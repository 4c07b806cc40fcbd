//! Queue manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use deployhub_core::config::QueueConfig;
use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::traits::queue::TaskQueue;

/// Wraps the task queue provider selected by configuration.
#[derive(Debug, Clone)]
pub struct QueueManager {
    inner: Arc<dyn TaskQueue>,
}

impl QueueManager {
    /// Create a new queue manager from configuration.
    pub async fn new(config: &QueueConfig) -> AppResult<Self> {
        let inner: Arc<dyn TaskQueue> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis task queue");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisTaskQueue::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory task queue");
                Arc::new(crate::memory::MemoryTaskQueue::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue provider: '{other}'. Supported: redis, memory"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a queue manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn TaskQueue>) -> Self {
        Self { inner: provider }
    }
}

#[async_trait]
impl TaskQueue for QueueManager {
    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }

    async fn push(&self, queue: &str, payload: &str) -> AppResult<()> {
        self.inner.push(queue, payload).await
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> AppResult<Option<String>> {
        self.inner.pop(queue, timeout).await
    }

    async fn len(&self, queue: &str) -> AppResult<u64> {
        self.inner.len(queue).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
