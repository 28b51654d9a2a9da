// Local executor: runs a Workload on tokio's blocking pool
// reason: tokio Semaphore caps concurrent jobs at the worker count
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use dispatch_core::application::dispatcher::panic_message;
use dispatch_core::domain::WorkItem;
use dispatch_core::port::{CompletionNotifier, ExecutionError, JobExecutor, Workload};

/// In-process worker pool
///
/// Every accepted job becomes a task that waits for one of `workers` permits,
/// then runs the workload on a blocking thread. Workloads are CPU-bound, so
/// the async workers stay free for timers, signals and completion delivery
/// even when `workers` equals the runtime's thread count. A panic surfaces
/// as a `JoinError` instead of taking the pool down. The outcome is always
/// reported through the job's notifier.
///
/// Clones share the same permits, so `shutdown` on any clone stops them all.
pub struct LocalExecutor<W> {
    workload: Arc<W>,
    permits: Arc<Semaphore>,
    runtime: Handle,
    workers: usize,
}

impl<W> Clone for LocalExecutor<W> {
    fn clone(&self) -> Self {
        Self {
            workload: Arc::clone(&self.workload),
            permits: Arc::clone(&self.permits),
            runtime: self.runtime.clone(),
            workers: self.workers,
        }
    }
}

impl<W: Workload> LocalExecutor<W> {
    /// Create an executor on the current tokio runtime
    ///
    /// # Errors
    /// - ExecutionError::Rejected if called outside a tokio runtime
    pub fn new(workload: W, workers: usize) -> Result<Self, ExecutionError> {
        let runtime = Handle::try_current()
            .map_err(|e| ExecutionError::Rejected(format!("no tokio runtime: {}", e)))?;
        Ok(Self::with_handle(workload, workers, runtime))
    }

    pub fn with_handle(workload: W, workers: usize, runtime: Handle) -> Self {
        let workers = workers.max(1);
        debug!(workload = workload.name(), workers = workers, "Local executor created");
        Self {
            workload: Arc::new(workload),
            permits: Arc::new(Semaphore::new(workers)),
            runtime,
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Refuse new work; jobs waiting for a permit are reported Cancelled
    pub fn shutdown(&self) {
        if !self.permits.is_closed() {
            debug!(workload = self.workload.name(), "Local executor shut down");
        }
        self.permits.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.permits.is_closed()
    }
}

impl<W: Workload> JobExecutor<W::Payload, W::Output> for LocalExecutor<W> {
    fn submit(
        &self,
        item: WorkItem<W::Payload>,
        notifier: CompletionNotifier<W::Output>,
    ) -> Result<(), ExecutionError> {
        if self.permits.is_closed() {
            return Err(ExecutionError::Rejected("executor is shut down".to_string()));
        }

        let workload = Arc::clone(&self.workload);
        let permits = Arc::clone(&self.permits);
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            let job_id = item.id;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    notifier.notify(Err(ExecutionError::Cancelled(
                        "executor shut down before the job started".to_string(),
                    )));
                    return;
                }
            };

            let payload = item.into_payload();
            let handle = runtime.clone();
            let run = runtime.spawn_blocking(move || handle.block_on(workload.execute(payload)));
            let outcome = match run.await {
                Ok(outcome) => outcome,
                Err(join_err) if join_err.is_panic() => {
                    let panic_msg = panic_message(join_err.into_panic().as_ref());
                    error!(job_id = %job_id, panic_msg = %panic_msg, "Workload panicked");
                    Err(ExecutionError::Panicked(panic_msg))
                }
                Err(join_err) => Err(ExecutionError::Cancelled(join_err.to_string())),
            };
            notifier.notify(outcome);
        });

        Ok(())
    }
}
