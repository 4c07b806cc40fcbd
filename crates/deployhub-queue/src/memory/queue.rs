//! In-process task queue.
//!
//! Not durable: contents are lost when the process exits. Intended for
//! single-node development and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::traits::queue::TaskQueue;

/// FIFO lists keyed by queue name.
#[derive(Debug, Default)]
pub struct MemoryTaskQueue {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
}

impl MemoryTaskQueue {
    /// Create an empty queue set.
    pub fn new() -> Self {
        Self::default()
    }

    fn try_pop(&self, queue: &str) -> AppResult<Option<String>> {
        let mut lists = self
            .lists
            .lock()
            .map_err(|_| AppError::internal("Memory queue lock poisoned"))?;
        Ok(lists.get_mut(queue).and_then(VecDeque::pop_front))
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn push(&self, queue: &str, payload: &str) -> AppResult<()> {
        {
            let mut lists = self
                .lists
                .lock()
                .map_err(|_| AppError::internal("Memory queue lock poisoned"))?;
            lists
                .entry(queue.to_string())
                .or_default()
                .push_back(payload.to_string());
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> AppResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a push between the check
            // and the wait is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop(queue)? {
                return Ok(Some(item));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn len(&self, queue: &str) -> AppResult<u64> {
        let lists = self
            .lists
            .lock()
            .map_err(|_| AppError::internal("Memory queue lock poisoned"))?;
        Ok(lists.get(queue).map_or(0, |l| l.len() as u64))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
