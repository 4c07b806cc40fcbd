//! Deployment queue consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;

use deployhub_core::config::{QueueConfig, WorkerConfig};
use deployhub_core::traits::queue::TaskQueue;
use deployhub_entity::deployment::DeploymentTask;

use crate::error::TaskError;
use crate::handler::TaskHandler;
use crate::processor::ProcessOutcome;

/// Back-off after a failed pop so a dead backend is not hammered.
const POP_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Drains the deployment queue, running each task on its own Tokio task
/// under an admission gate.
///
/// A slot is acquired *before* a payload is popped and moves into the
/// spawned task as an owned permit, so it is released on every exit path,
/// including panics.
#[derive(Debug)]
pub struct DeploymentConsumer {
    queue: Arc<dyn TaskQueue>,
    handler: Arc<dyn TaskHandler>,
    queue_name: String,
    pop_timeout: Duration,
    max_concurrent: usize,
    task_timeout: Duration,
}

impl DeploymentConsumer {
    /// Create a consumer from configuration.
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        handler: Arc<dyn TaskHandler>,
        queue_config: &QueueConfig,
        worker_config: &WorkerConfig,
    ) -> Self {
        Self {
            queue,
            handler,
            queue_name: queue_config.queue_name.clone(),
            pop_timeout: Duration::from_secs(queue_config.pop_timeout_seconds.max(1)),
            max_concurrent: worker_config.max_concurrent_tasks.max(1),
            task_timeout: Duration::from_secs(worker_config.task_timeout_seconds),
        }
    }

    /// Consume until `cancel` flips to `true`, then wait for every in-flight
    /// task. Each task is already bounded by the task deadline.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            queue = %self.queue_name,
            provider = self.queue.provider_type(),
            max_concurrent = self.max_concurrent,
            "Deployment consumer started"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        loop {
            if *cancel.borrow() {
                break;
            }

            let permit = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                    continue;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            // The pop is never raced against cancellation: dropping an
            // in-flight BLPOP could lose a message the server already
            // removed. The short timeout bounds the shutdown delay.
            match self.queue.pop(&self.queue_name, self.pop_timeout).await {
                Ok(Some(payload)) => self.dispatch(&payload, permit),
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    tracing::error!(queue = %self.queue_name, error = %e, "Failed to pop from queue");
                    tokio::select! {
                        _ = cancel.changed() => {}
                        _ = time::sleep(POP_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!("Deployment consumer waiting for in-flight tasks to complete...");

        let all = u32::try_from(self.max_concurrent).unwrap_or(u32::MAX);
        match semaphore.acquire_many(all).await {
            Ok(_) => tracing::info!("Deployment consumer shut down complete"),
            Err(e) => tracing::error!(error = %e, "Deployment consumer gate closed during drain"),
        }
    }

    /// Decode a payload and spawn its handler, handing over the slot.
    fn dispatch(&self, payload: &str, permit: tokio::sync::OwnedSemaphorePermit) {
        let task = match DeploymentTask::decode(payload) {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(error = %TaskError::from(e), "Dropping malformed deployment task");
                return;
            }
        };

        let handler = Arc::clone(&self.handler);
        let task_timeout = self.task_timeout;

        tokio::spawn(async move {
            let _permit = permit;
            let deployment_id = task.deployment_id;

            let outcome = match time::timeout(task_timeout, handler.handle(task)).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::Timeout(task_timeout)),
            };

            match outcome {
                Ok(ProcessOutcome::Ready) => {
                    tracing::info!(%deployment_id, "Deployment task completed");
                }
                Ok(ProcessOutcome::Failed(reason)) => {
                    tracing::warn!(%deployment_id, %reason, "Deployment marked as error");
                }
                Ok(ProcessOutcome::Skipped(status)) => {
                    tracing::debug!(%deployment_id, %status, "Deployment task skipped");
                }
                Err(e) => {
                    tracing::error!(%deployment_id, error = %e, "Deployment task failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use deployhub_core::types::{DeploymentId, ProjectId};
    use deployhub_queue::memory::MemoryTaskQueue;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingHandler {
        running: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<DeploymentId>>,
        delay: Duration,
        panic_on_first: bool,
    }

    #[async_trait]
    impl TaskHandler for CountingHandler {
        async fn handle(&self, task: DeploymentTask) -> Result<ProcessOutcome, TaskError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let first = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(task.deployment_id);
                seen.len() == 1
            };
            if self.panic_on_first && first {
                panic!("handler blew up");
            }
            Ok(ProcessOutcome::Ready)
        }
    }

    fn task() -> String {
        serde_json::to_string(&DeploymentTask {
            deployment_id: DeploymentId::new(),
            project_id: ProjectId::new(),
            content_hash: "abc".to_string(),
        })
        .unwrap()
    }

    fn consumer(queue: Arc<MemoryTaskQueue>, handler: Arc<CountingHandler>, max: usize) -> DeploymentConsumer {
        DeploymentConsumer::new(
            queue,
            handler,
            &QueueConfig::default(),
            &WorkerConfig {
                max_concurrent_tasks: max,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_bounded_concurrency_and_drain() {
        let queue = Arc::new(MemoryTaskQueue::new());
        for _ in 0..10 {
            queue.push("deployments", &task()).await.unwrap();
        }
        queue.push("deployments", "not json").await.unwrap();

        let handler = Arc::new(CountingHandler {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        let consumer = Arc::new(consumer(queue.clone(), handler.clone(), 3));

        let (tx, rx) = watch::channel(false);
        let run = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.run(rx).await })
        };

        for _ in 0..200 {
            if queue.len("deployments").await.unwrap() == 0 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        run.await.unwrap();

        assert_eq!(handler.seen.lock().unwrap().len(), 10);
        assert!(handler.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(handler.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_handler_releases_slot() {
        let queue = Arc::new(MemoryTaskQueue::new());
        for _ in 0..3 {
            queue.push("deployments", &task()).await.unwrap();
        }

        let handler = Arc::new(CountingHandler {
            panic_on_first: true,
            ..Default::default()
        });
        let consumer = Arc::new(consumer(queue.clone(), handler.clone(), 1));

        let (tx, rx) = watch::channel(false);
        let run = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.run(rx).await })
        };

        for _ in 0..200 {
            if handler.seen.lock().unwrap().len() == 3 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        run.await.unwrap();

        assert_eq!(handler.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_waits_for_slow_task() {
        let queue = Arc::new(MemoryTaskQueue::new());
        queue.push("deployments", &task()).await.unwrap();

        let handler = Arc::new(CountingHandler {
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let consumer = Arc::new(DeploymentConsumer::new(
            queue.clone(),
            handler.clone(),
            &QueueConfig::default(),
            &WorkerConfig {
                max_concurrent_tasks: 4,
                task_timeout_seconds: 60,
                ..Default::default()
            },
        ));

        let (tx, rx) = watch::channel(false);
        let run = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.run(rx).await })
        };

        for _ in 0..200 {
            if handler.running.load(Ordering::SeqCst) == 1 {
                break;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(handler.running.load(Ordering::SeqCst), 1);
        tx.send(true).unwrap();
        run.await.unwrap();

        assert_eq!(handler.seen.lock().unwrap().len(), 1);
        assert_eq!(handler.running.load(Ordering::SeqCst), 0);
    }
}
