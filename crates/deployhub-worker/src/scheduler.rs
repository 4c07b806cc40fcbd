//! Periodic batch runner for maintenance work.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;

type Retriever<T> = Arc<dyn Fn() -> BoxFuture<'static, AppResult<Vec<T>>> + Send + Sync>;
type Executor<T> = Arc<dyn Fn(T) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;
type ErrorHandler<T> = Arc<dyn Fn(&T, &AppError) + Send + Sync>;

/// Fetches a batch of items on every tick and processes them concurrently
/// under a fixed cap.
///
/// Each tick runs to completion before the next one is considered: the
/// retriever is called, every item is dispatched (at most `concurrency` at
/// a time) and the whole batch is awaited. A failing item is reported to
/// the error handler and never affects its siblings. A retriever failure
/// or an empty batch skips the tick.
pub struct MaintenanceRunner<T> {
    name: &'static str,
    interval: Duration,
    concurrency: usize,
    item_timeout: Option<Duration>,
    retriever: Retriever<T>,
    executor: Executor<T>,
    on_error: ErrorHandler<T>,
}

impl<T> fmt::Debug for MaintenanceRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceRunner")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("concurrency", &self.concurrency)
            .field("item_timeout", &self.item_timeout)
            .finish()
    }
}

impl<T> MaintenanceRunner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a runner. Errors are logged until a handler is installed
    /// with [`Self::with_error_handler`].
    pub fn new<R, RF, E, EF>(
        name: &'static str,
        interval: Duration,
        concurrency: usize,
        retriever: R,
        executor: E,
    ) -> Self
    where
        R: Fn() -> RF + Send + Sync + 'static,
        RF: Future<Output = AppResult<Vec<T>>> + Send + 'static,
        E: Fn(T) -> EF + Send + Sync + 'static,
        EF: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            name,
            interval,
            concurrency: concurrency.max(1),
            item_timeout: None,
            retriever: Arc::new(move || -> BoxFuture<'static, AppResult<Vec<T>>> {
                Box::pin(retriever())
            }),
            executor: Arc::new(move |item: T| -> BoxFuture<'static, AppResult<()>> {
                Box::pin(executor(item))
            }),
            on_error: Arc::new(move |_item: &T, err: &AppError| {
                tracing::error!(runner = name, error = %err, "Maintenance item failed");
            }),
        }
    }

    /// Install the per-item error handler.
    pub fn with_error_handler(
        mut self,
        on_error: impl Fn(&T, &AppError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Arc::new(on_error);
        self
    }

    /// Bound each item's execution; an overrun is reported as a timeout
    /// error to the handler.
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    /// Tick until `cancel` flips to `true`. The first tick fires one
    /// interval after start.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            runner = self.name,
            interval_secs = self.interval.as_secs(),
            concurrency = self.concurrency,
            "Maintenance runner started"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *cancel.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_once(&cancel).await;
                }
            }
        }

        tracing::info!(runner = self.name, "Maintenance runner stopped");
    }

    /// Run one fetch-dispatch-wait cycle. Returns the number of items
    /// dispatched.
    ///
    /// Dispatch stops early once `cancel` is set; items already started
    /// still run to completion.
    pub async fn run_once(&self, cancel: &watch::Receiver<bool>) -> usize {
        let items = match (self.retriever)().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(runner = self.name, error = %e, "Maintenance retriever failed");
                return 0;
            }
        };

        if items.is_empty() {
            return 0;
        }

        tracing::debug!(runner = self.name, count = items.len(), "Processing maintenance batch");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        for item in items {
            if *cancel.borrow() {
                tracing::info!(runner = self.name, "Cancelled, not dispatching remaining items");
                break;
            }

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            // Cancellation may arrive while waiting for a slot.
            if *cancel.borrow() {
                tracing::info!(runner = self.name, "Cancelled, not dispatching remaining items");
                break;
            }

            let executor = Arc::clone(&self.executor);
            let on_error = Arc::clone(&self.on_error);
            let item_timeout = self.item_timeout;

            tasks.spawn(async move {
                let _permit = permit;
                let work = executor(item.clone());
                let outcome = match item_timeout {
                    Some(limit) => match time::timeout(limit, work).await {
                        Ok(result) => result,
                        Err(_) => Err(AppError::timeout(format!(
                            "Maintenance item exceeded {}s",
                            limit.as_secs()
                        ))),
                    },
                    None => work.await,
                };
                if let Err(e) = outcome {
                    on_error(&item, &e);
                }
            });
            dispatched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(runner = self.name, error = %e, "Maintenance task panicked");
            }
        }

        dispatched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn never_cancelled() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_siblings() {
        let done = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(Mutex::new(Vec::new()));

        let done_in = Arc::clone(&done);
        let failed_in = Arc::clone(&failed);
        let runner = MaintenanceRunner::new(
            "test",
            Duration::from_secs(60),
            2,
            || async { Ok((0..6).collect::<Vec<u32>>()) },
            move |n| {
                let done = Arc::clone(&done_in);
                async move {
                    if n % 3 == 0 {
                        return Err(AppError::internal(format!("item {n} broke")));
                    }
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .with_error_handler(move |item, _err| failed_in.lock().unwrap().push(*item));

        assert_eq!(runner.run_once(&never_cancelled()).await, 6);
        assert_eq!(done.load(Ordering::SeqCst), 4);
        let mut failed = failed.lock().unwrap().clone();
        failed.sort();
        assert_eq!(failed, vec![0, 3]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (running_in, peak_in) = (Arc::clone(&running), Arc::clone(&peak));
        let runner = MaintenanceRunner::new(
            "bounded",
            Duration::from_secs(60),
            3,
            || async { Ok((0..12).collect::<Vec<u32>>()) },
            move |_n| {
                let running = Arc::clone(&running_in);
                let peak = Arc::clone(&peak_in);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        );

        runner.run_once(&never_cancelled()).await;
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retriever_failure_skips_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        let runner = MaintenanceRunner::new(
            "failing",
            Duration::from_secs(60),
            1,
            || async { Err::<Vec<u32>, _>(AppError::database("down")) },
            move |_n| {
                calls_in.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        );

        assert_eq!(runner.run_once(&never_cancelled()).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_timeout_reported_as_error() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_in = Arc::clone(&errors);
        let runner = MaintenanceRunner::new(
            "slow",
            Duration::from_secs(60),
            1,
            || async { Ok(vec![1u32]) },
            |_n| async {
                time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
        )
        .with_item_timeout(Duration::from_secs(1))
        .with_error_handler(move |_item, err| errors_in.lock().unwrap().push(err.kind));

        runner.run_once(&never_cancelled()).await;
        assert_eq!(
            *errors.lock().unwrap(),
            vec![deployhub_core::error::ErrorKind::Timeout]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticks_in = Arc::clone(&ticks);
        let runner = Arc::new(MaintenanceRunner::new(
            "ticker",
            Duration::from_secs(5),
            1,
            move || {
                ticks_in.fetch_add(1, Ordering::SeqCst);
                async { Ok(Vec::<u32>::new()) }
            },
            |_n| async { Ok(()) },
        ));

        let (tx, rx) = watch::channel(false);
        let handle = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run(rx).await })
        };

        time::sleep(Duration::from_secs(16)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_finishes_dispatched_items_only() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let fetches_in = Arc::clone(&fetches);
        let (started_in, finished_in) = (Arc::clone(&started), Arc::clone(&finished));
        let runner = Arc::new(MaintenanceRunner::new(
            "draining",
            Duration::from_secs(5),
            2,
            move || {
                fetches_in.fetch_add(1, Ordering::SeqCst);
                async { Ok((0..6).collect::<Vec<u32>>()) }
            },
            move |_n| {
                let started = Arc::clone(&started_in);
                let finished = Arc::clone(&finished_in);
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    time::sleep(Duration::from_secs(10)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        let (tx, rx) = watch::channel(false);
        let handle = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run(rx).await })
        };

        // First tick at 5s dispatches two items that run until 15s.
        time::sleep(Duration::from_secs(8)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
