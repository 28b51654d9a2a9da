// Job Executor Port
// Abstraction for the external system that runs submitted work and reports back

use crate::domain::{JobId, WorkItem};
use std::sync::Arc;
use thiserror::Error;

/// Execution errors reported by an executor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Job failed: {0}")]
    Failed(String),

    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("Job cancelled: {0}")]
    Cancelled(String),

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Receiver of completion notifications
///
/// Implemented by the dispatcher. Executors never see this directly, they
/// get a `CompletionNotifier` bound to one job.
pub trait CompletionSink<R>: Send + Sync {
    /// Deliver the outcome of job `id`. May be called from any thread.
    fn on_completion(&self, id: JobId, outcome: Result<R, ExecutionError>);
}

/// Completion callback bound to a single job
pub struct CompletionNotifier<R> {
    id: JobId,
    sink: Arc<dyn CompletionSink<R>>,
}

impl<R> Clone for CompletionNotifier<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<R> std::fmt::Debug for CompletionNotifier<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionNotifier")
            .field("id", &self.id)
            .finish()
    }
}

impl<R> CompletionNotifier<R> {
    pub fn new(id: JobId, sink: Arc<dyn CompletionSink<R>>) -> Self {
        Self { id, sink }
    }

    pub fn job_id(&self) -> JobId {
        self.id
    }

    /// Report the job outcome
    ///
    /// Executors must call this exactly once per accepted job. Extra calls
    /// are tolerated by the dispatcher and ignored.
    pub fn notify(&self, outcome: Result<R, ExecutionError>) {
        self.sink.on_completion(self.id, outcome);
    }
}

/// Job Executor trait
///
/// Implementations:
/// - LocalExecutor (infra-system): runs a `Workload` on the tokio runtime
/// - mocks::ManualExecutor / ImmediateExecutor / RejectingExecutor (tests)
pub trait JobExecutor<P, R>: Send + Sync {
    /// Accept a work item for asynchronous execution
    ///
    /// Must not block. Returning `Ok` is a promise that `notifier` will be
    /// called once the job finishes; returning `Err` means the job never
    /// started and the notifier will not be called.
    ///
    /// # Errors
    /// - ExecutionError::Rejected if the executor cannot accept more work
    fn submit(&self, item: WorkItem<P>, notifier: CompletionNotifier<R>) -> Result<(), ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    type Inflight<P, R> = Vec<(WorkItem<P>, CompletionNotifier<R>)>;

    struct ManualState<P, R> {
        inflight: Inflight<P, R>,
        submitted: usize,
        peak_inflight: usize,
    }

    /// Executor that holds every job until the test completes it
    pub struct ManualExecutor<P, R> {
        state: Arc<Mutex<ManualState<P, R>>>,
    }

    impl<P, R> Clone for ManualExecutor<P, R> {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
            }
        }
    }

    impl<P, R> Default for ManualExecutor<P, R> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<P, R> ManualExecutor<P, R> {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(ManualState {
                    inflight: Vec::new(),
                    submitted: 0,
                    peak_inflight: 0,
                })),
            }
        }

        pub fn submitted_count(&self) -> usize {
            self.state.lock().unwrap().submitted
        }

        pub fn inflight_len(&self) -> usize {
            self.state.lock().unwrap().inflight.len()
        }

        /// Highest number of accepted-but-unfinished jobs ever held
        pub fn peak_inflight(&self) -> usize {
            self.state.lock().unwrap().peak_inflight
        }

        /// Take every held job without completing it
        pub fn take_inflight(&self) -> Inflight<P, R> {
            std::mem::take(&mut self.state.lock().unwrap().inflight)
        }

        /// Complete every held job with `f`, returning how many were completed
        pub fn complete_all(&self, f: impl Fn(&P) -> Result<R, ExecutionError>) -> usize {
            // notify outside our own lock: the sink takes the dispatcher lock
            let jobs = self.take_inflight();
            let count = jobs.len();
            for (item, notifier) in jobs {
                notifier.notify(f(&item.payload));
            }
            count
        }

        /// Complete the oldest held job, if any
        pub fn complete_next(&self, f: impl FnOnce(&P) -> Result<R, ExecutionError>) -> Option<JobId> {
            let job = {
                let mut state = self.state.lock().unwrap();
                if state.inflight.is_empty() {
                    None
                } else {
                    Some(state.inflight.remove(0))
                }
            };
            job.map(|(item, notifier)| {
                notifier.notify(f(&item.payload));
                item.id
            })
        }
    }

    impl<P: Send, R: Send> JobExecutor<P, R> for ManualExecutor<P, R> {
        fn submit(&self, item: WorkItem<P>, notifier: CompletionNotifier<R>) -> Result<(), ExecutionError> {
            let mut state = self.state.lock().unwrap();
            state.submitted += 1;
            state.inflight.push((item, notifier));
            state.peak_inflight = state.peak_inflight.max(state.inflight.len());
            Ok(())
        }
    }

    /// Executor that finishes every job inside `submit`, before it returns
    pub struct ImmediateExecutor<F> {
        run: F,
    }

    impl<F> ImmediateExecutor<F> {
        pub fn new(run: F) -> Self {
            Self { run }
        }
    }

    impl<P, R, F> JobExecutor<P, R> for ImmediateExecutor<F>
    where
        F: Fn(P) -> Result<R, ExecutionError> + Send + Sync,
    {
        fn submit(&self, item: WorkItem<P>, notifier: CompletionNotifier<R>) -> Result<(), ExecutionError> {
            notifier.notify((self.run)(item.payload));
            Ok(())
        }
    }

    /// Executor that refuses every job
    pub struct RejectingExecutor {
        reason: String,
    }

    impl RejectingExecutor {
        pub fn new(reason: impl Into<String>) -> Self {
            Self {
                reason: reason.into(),
            }
        }
    }

    impl<P, R> JobExecutor<P, R> for RejectingExecutor {
        fn submit(&self, _item: WorkItem<P>, _notifier: CompletionNotifier<R>) -> Result<(), ExecutionError> {
            Err(ExecutionError::Rejected(self.reason.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;
    use std::sync::Mutex;

    /// Sink that just records what it receives
    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<(JobId, Result<u32, ExecutionError>)>>,
    }

    impl CompletionSink<u32> for RecordingSink {
        fn on_completion(&self, id: JobId, outcome: Result<u32, ExecutionError>) {
            self.seen.lock().unwrap().push((id, outcome));
        }
    }

    #[test]
    fn test_notifier_routes_to_sink() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = CompletionNotifier::new(JobId::new(4), sink.clone() as Arc<dyn CompletionSink<u32>>);
        assert_eq!(notifier.job_id(), JobId::new(4));

        notifier.notify(Ok(10));
        notifier.clone().notify(Err(ExecutionError::Failed("boom".to_string())));

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (JobId::new(4), Ok(10)));
        assert!(matches!(seen[1].1, Err(ExecutionError::Failed(_))));
    }

    #[test]
    fn test_manual_executor_holds_until_completed() {
        let sink = Arc::new(RecordingSink::default());
        let executor: ManualExecutor<u32, u32> = ManualExecutor::new();

        for id in 1..=3u64 {
            let notifier = CompletionNotifier::new(JobId::new(id), sink.clone() as Arc<dyn CompletionSink<u32>>);
            executor.submit(WorkItem::new(JobId::new(id), id as u32), notifier).unwrap();
        }
        assert_eq!(executor.inflight_len(), 3);
        assert_eq!(executor.peak_inflight(), 3);

        assert_eq!(executor.complete_next(|p| Ok(p * 10)), Some(JobId::new(1)));
        assert_eq!(executor.complete_all(|p| Ok(p * 10)), 2);
        assert_eq!(executor.inflight_len(), 0);
        assert_eq!(executor.submitted_count(), 3);
        assert_eq!(sink.seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_immediate_and_rejecting_executors() {
        let sink = Arc::new(RecordingSink::default());
        let immediate = ImmediateExecutor::new(|p: u32| Ok::<u32, ExecutionError>(p + 1));
        let notifier = CompletionNotifier::new(JobId::new(1), sink.clone() as Arc<dyn CompletionSink<u32>>);
        immediate.submit(WorkItem::new(JobId::new(1), 41), notifier).unwrap();
        assert_eq!(sink.seen.lock().unwrap()[0], (JobId::new(1), Ok(42)));

        let rejecting = RejectingExecutor::new("cluster offline");
        let notifier = CompletionNotifier::new(JobId::new(2), sink.clone() as Arc<dyn CompletionSink<u32>>);
        let err = JobExecutor::<u32, u32>::submit(&rejecting, WorkItem::new(JobId::new(2), 1), notifier).unwrap_err();
        assert_eq!(err, ExecutionError::Rejected("cluster offline".to_string()));
        assert_eq!(sink.seen.lock().unwrap().len(), 1);
    }
}
