//! Bounded fan-out/fan-in of site tasks.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::error_handling::InitializationError;
use crate::initialization::init_semaphore;
use crate::models::FetchTask;

/// Why a task produced no result of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFault {
    /// The worker panicked; the payload message when it was a string.
    Panicked(String),
    /// The batch was cancelled before the task was dispatched.
    NotStarted,
    /// The runtime aborted the worker.
    Aborted,
}

impl std::fmt::Display for TaskFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFault::Panicked(message) => write!(f, "task panicked: {message}"),
            TaskFault::NotStarted => f.write_str("batch cancelled before the task started"),
            TaskFault::Aborted => f.write_str("task aborted"),
        }
    }
}

fn fault_from_join_error(e: JoinError) -> TaskFault {
    if e.is_panic() {
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        TaskFault::Panicked(message)
    } else {
        TaskFault::Aborted
    }
}

/// Runs at most `limit` workers at once over a task sequence.
///
/// Tasks are dispatched in submission order as permits free up. Every task
/// yields exactly one result: the worker's own, or `fallback(task, fault)`
/// when the worker panicked or never started. Cancelling the token stops
/// dispatching immediately; running workers receive a child token and are
/// expected to wind down, and their results are still collected.
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    semaphore: Arc<Semaphore>,
    limit: usize,
    cancel: CancellationToken,
}

impl ConcurrencyController {
    /// # Errors
    ///
    /// Returns `InitializationError::ConfigError` when `limit` is zero.
    pub fn new(limit: usize, cancel: CancellationToken) -> Result<Self, InitializationError> {
        if limit == 0 {
            return Err(InitializationError::ConfigError(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            semaphore: init_semaphore(limit),
            limit,
            cancel,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `worker` over `tasks`, handing each result to `on_complete` as
    /// soon as it is available (completion order, not submission order).
    pub async fn run<T, W, Fut, F, C>(
        &self,
        tasks: Vec<FetchTask>,
        worker: W,
        fallback: F,
        mut on_complete: C,
    ) where
        T: Send + 'static,
        W: Fn(FetchTask, CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        F: Fn(&FetchTask, TaskFault) -> T,
        C: FnMut(T),
    {
        let mut pending = tasks.into_iter().peekable();
        let mut running: FuturesUnordered<BoxFuture<'static, (FetchTask, Result<T, JoinError>)>> =
            FuturesUnordered::new();

        loop {
            let has_pending = pending.peek().is_some();
            tokio::select! {
                biased;

                _ = self.cancel.cancelled(), if has_pending => {
                    let skipped: Vec<FetchTask> = pending.by_ref().collect();
                    log::warn!("Batch cancelled, {} task(s) not started", skipped.len());
                    for task in skipped {
                        on_complete(fallback(&task, TaskFault::NotStarted));
                    }
                }

                Some((task, joined)) = running.next(), if !running.is_empty() => {
                    match joined {
                        Ok(result) => on_complete(result),
                        Err(e) => {
                            let fault = fault_from_join_error(e);
                            log::error!("Task for {} failed: {fault}", task.url());
                            on_complete(fallback(&task, fault));
                        }
                    }
                }

                permit = Arc::clone(&self.semaphore).acquire_owned(), if has_pending => {
                    let Ok(permit) = permit else {
                        log::error!("Concurrency semaphore closed unexpectedly");
                        break;
                    };
                    let Some(task) = pending.next() else {
                        continue;
                    };
                    log::debug!("Dispatching task {} ({})", task.index(), task.url());
                    let work = worker(task.clone(), self.cancel.child_token());
                    let handle = tokio::spawn(async move {
                        let _permit = permit;
                        work.await
                    });
                    running.push(async move { (task, handle.await) }.boxed());
                }

                else => break,
            }
        }

        // Only reached on a closed semaphore: account for what never ran.
        for task in pending {
            on_complete(fallback(&task, TaskFault::NotStarted));
        }
    }

    /// Like [`ConcurrencyController::run`], collecting results into a vector.
    pub async fn collect<T, W, Fut, F>(
        &self,
        tasks: Vec<FetchTask>,
        worker: W,
        fallback: F,
    ) -> Vec<T>
    where
        T: Send + 'static,
        W: Fn(FetchTask, CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        F: Fn(&FetchTask, TaskFault) -> T,
    {
        let mut results = Vec::with_capacity(tasks.len());
        self.run(tasks, worker, fallback, |result| results.push(result))
            .await;
        results
    }
}
