use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Task pool for submitter work and delayed retries.
///
/// Parallelism is bounded by a fixed number of permits (`threadPoolSize`).
/// Delayed tasks run at most once: a task whose delay has not elapsed when
/// the scheduler shuts down is discarded. Immediate tasks are still
/// accepted during shutdown so in-flight submissions can finish their
/// spillover work within the grace period; they are simply no longer
/// awaited once the grace period expires.
#[derive(Debug, Clone)]
pub struct Scheduler {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(pool_size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Run `task` as soon as a worker permit is free.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire().await else {
                return;
            };
            task.await;
        });
    }

    /// Run `task` after `delay`. The wait aborts wholesale at shutdown.
    pub fn schedule_after<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            debug!("scheduler stopped, dropping delayed task");
            return;
        }
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            let Ok(_permit) = permits.acquire().await else {
                return;
            };
            task.await;
        });
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop accepting tasks, cancel unfired delays, and wait up to `grace`
    /// for running tasks. Returns false when the grace period expired with
    /// tasks still in flight.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.cancel.cancel();
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}
