// Bounded Job Dispatcher
//
// Submits work to an executor while keeping at most `upper_bound` jobs
// outstanding. Completions may arrive on any thread, in any order; they are
// serialized by a single lock that guards both the PendingSet and the
// completion handler's aggregate state.

mod panic_guard;
mod pending;
mod report;

pub use panic_guard::{execute_guarded, panic_message};
pub use pending::PendingSet;
pub use report::DispatchReport;

use crate::domain::{DomainError, JobHandle, JobId, WindowConfig, WorkItem};
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{CompletionNotifier, CompletionSink, ExecutionError, JobExecutor, TimeProvider};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What the dispatcher should do after a completion was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Aggregate goal reached: stop submitting new work
    Stop,
}

/// Receives every job exactly once, when it reaches a terminal state
///
/// Called with the dispatcher lock held, in completion order. Must not call
/// back into the dispatcher.
pub trait CompletionHandler<R>: Send + 'static {
    fn on_completion(&mut self, job: &JobHandle<R>) -> Flow;
}

/// Dispatcher errors
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("Dispatch session cancelled, no further submissions accepted")]
    Cancelled,

    #[error("Job {id} rejected by executor: {source}")]
    Rejected { id: JobId, source: ExecutionError },

    #[error("Concurrency invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

struct DispatchState<R, H> {
    pending: PendingSet<R>,
    handler: H,
    report: DispatchReport,
    cancelled: bool,
    halted: Option<String>,
}

impl<R, H> DispatchState<R, H> {
    fn ensure_accepting(&self) -> Result<(), DispatchError> {
        if let Some(reason) = &self.halted {
            return Err(DispatchError::InvariantViolation(reason.clone()));
        }
        if self.cancelled {
            return Err(DispatchError::Cancelled);
        }
        Ok(())
    }

    fn halted_error(&self) -> Option<DispatchError> {
        self.halted
            .as_ref()
            .map(|reason| DispatchError::InvariantViolation(reason.clone()))
    }
}

/// State shared between the submission side and completion notifiers
struct Shared<R, H> {
    session_id: Uuid,
    window: WindowConfig,
    time: Arc<dyn TimeProvider>,
    state: Mutex<DispatchState<R, H>>,
    signal: Notify,
}

impl<R, H> Shared<R, H>
where
    R: Send + 'static,
    H: CompletionHandler<R>,
{
    fn lock_state(&self) -> MutexGuard<'_, DispatchState<R, H>> {
        // handler panics are caught before they can poison the lock
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspend until `ready` holds
    ///
    /// The `Notified` future is registered before the predicate is checked,
    /// so a signal fired between the check and the await is not lost.
    async fn wait_until<F>(&self, ready: F)
    where
        F: Fn(&DispatchState<R, H>) -> bool,
    {
        loop {
            let notified = self.signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let done = {
                let state = self.lock_state();
                ready(&state)
            };
            if done {
                return;
            }
            notified.await;
        }
    }

    fn halt(&self, state: &mut DispatchState<R, H>, reason: String) -> DispatchError {
        if state.halted.is_none() {
            error!(session_id = %self.session_id, reason = %reason, "Dispatch session halted");
            state.halted = Some(reason.clone());
        }
        self.signal.notify_waiters();
        DispatchError::InvariantViolation(reason)
    }

    fn cancel_locked(&self, state: &mut DispatchState<R, H>, reason: &str) {
        if !state.cancelled {
            state.cancelled = true;
            state.report.stopped_early = true;
            info!(
                session_id = %self.session_id,
                reason = %reason,
                pending = state.pending.len(),
                "Submission stopped, in-flight jobs will still be collected"
            );
        }
        self.signal.notify_waiters();
    }

    fn signal_if_room(&self, state: &DispatchState<R, H>) {
        if self.window.has_room(state.pending.len()) {
            self.signal.notify_waiters();
        }
    }

    /// Hand a terminal job to the handler
    fn deliver(&self, state: &mut DispatchState<R, H>, handle: &JobHandle<R>) {
        let handler = &mut state.handler;
        match execute_guarded(|| handler.on_completion(handle)) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => self.cancel_locked(state, "completion handler reached its goal"),
            Err(panic_msg) => {
                self.halt(
                    state,
                    format!("completion handler panicked on job {}: {}", handle.id, panic_msg),
                );
            }
        }
    }

    fn complete(&self, id: JobId, outcome: Result<R, ExecutionError>) {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        if state.halted.is_some() {
            warn!(job_id = %id, "Completion after session halt ignored");
            return;
        }

        let Some(mut handle) = state.pending.take(id) else {
            if state.pending.was_issued(id) {
                state.report.duplicates += 1;
                warn!(job_id = %id, "Duplicate or late completion ignored");
            } else {
                self.halt(state, format!("completion for unknown job {}", id));
            }
            return;
        };

        let now = self.time.now_millis();
        let transition = match outcome {
            Ok(result) => handle.complete(result, now),
            Err(ExecutionError::Cancelled(reason)) => handle.cancel(reason, now),
            Err(err) => handle.fail(err.to_string(), now),
        };
        if let Err(err) = transition {
            self.halt(state, err.to_string());
            return;
        }

        state.report.record(handle.status);
        match &handle.failure {
            None => debug!(job_id = %id, pending = state.pending.len(), "Job completed"),
            Some(failure) => warn!(
                job_id = %id,
                status = %handle.status,
                failure = %failure,
                pending = state.pending.len(),
                "Job did not complete"
            ),
        }

        self.deliver(state, &handle);
        self.signal_if_room(state);
    }

    fn mark_submitted(&self, id: JobId) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        state.report.submitted += 1;

        let now = self.time.now_millis();
        match state.pending.get_mut(id) {
            Some(handle) => {
                if let Err(err) = handle.mark_submitted(now) {
                    self.halt(state, err.to_string());
                }
            }
            // the executor finished it before submit returned
            None => debug!(job_id = %id, "Job finished before registration completed"),
        }
    }

    fn reject(&self, id: JobId, source: &ExecutionError) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        state.report.rejected += 1;
        warn!(job_id = %id, error = %source, "Executor rejected job");

        if let Some(mut handle) = state.pending.take(id) {
            let now = self.time.now_millis();
            if let Err(err) = handle.abandon(source.to_string(), now) {
                self.halt(state, err.to_string());
                return;
            }
            self.deliver(state, &handle);
        }
        self.signal_if_room(state);
    }

    fn abandon_remaining(&self, reason: &str) -> usize {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let handles = state.pending.take_all();
        let count = handles.len();
        if count > 0 {
            warn!(session_id = %self.session_id, abandoned = count, reason = %reason, "Abandoning unfinished jobs");
        }
        self.cancel_locked(state, reason);

        let now = self.time.now_millis();
        for mut handle in handles {
            if let Err(err) = handle.abandon(reason, now) {
                self.halt(state, err.to_string());
                break;
            }
            state.report.record(handle.status);
            self.deliver(state, &handle);
        }
        self.signal.notify_waiters();
        count
    }

    fn snapshot(&self, state: &DispatchState<R, H>) -> DispatchReport {
        let mut report = state.report.clone();
        report.pending = state.pending.len();
        report
    }
}

impl<R, H> CompletionSink<R> for Shared<R, H>
where
    R: Send + 'static,
    H: CompletionHandler<R>,
{
    fn on_completion(&self, id: JobId, outcome: Result<R, ExecutionError>) {
        self.complete(id, outcome);
    }
}

trait Cancellable: Send + Sync {
    fn cancel(&self, reason: &str);
    fn is_cancelled(&self) -> bool;
}

impl<R, H> Cancellable for Shared<R, H>
where
    R: Send + 'static,
    H: CompletionHandler<R>,
{
    fn cancel(&self, reason: &str) {
        let mut state = self.lock_state();
        self.cancel_locked(&mut state, reason);
    }

    fn is_cancelled(&self) -> bool {
        self.lock_state().cancelled
    }
}

/// Cloneable handle that stops a session from another task
#[derive(Clone)]
pub struct CancelHandle {
    target: Arc<dyn Cancellable>,
}

impl CancelHandle {
    /// Stop new submissions; in-flight jobs still complete
    pub fn cancel(&self) {
        self.target.cancel("cancel requested");
    }

    pub fn is_cancelled(&self) -> bool {
        self.target.is_cancelled()
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Bounded-window job dispatcher
///
/// One submission task drives `submit` (it takes `&mut self`); completions
/// are delivered through `CompletionNotifier`s from any thread.
pub struct BoundedJobDispatcher<P, R, E, H> {
    shared: Arc<Shared<R, H>>,
    executor: E,
    _payload: PhantomData<fn(P)>,
}

impl<P, R, E, H> BoundedJobDispatcher<P, R, E, H>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    H: CompletionHandler<R>,
{
    /// Create a dispatcher using the system clock
    pub fn new(window: WindowConfig, executor: E, handler: H) -> Self {
        Self::with_time_provider(window, executor, handler, Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(
        window: WindowConfig,
        executor: E,
        handler: H,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(
            session_id = %session_id,
            lower_bound = window.lower_bound(),
            upper_bound = window.upper_bound(),
            "Dispatch session created"
        );

        Self {
            shared: Arc::new(Shared {
                session_id,
                window,
                time,
                state: Mutex::new(DispatchState {
                    pending: PendingSet::new(),
                    handler,
                    report: DispatchReport::new(session_id),
                    cancelled: false,
                    halted: None,
                }),
                signal: Notify::new(),
            }),
            executor,
            _payload: PhantomData,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    pub fn window(&self) -> WindowConfig {
        self.shared.window
    }

    /// Submit one payload and return its id
    ///
    /// Suspends once `upper_bound` jobs are pending until the count falls to
    /// `lower_bound`, or until the session is cancelled.
    ///
    /// # Errors
    /// - DispatchError::Cancelled if `cancel_remaining` was called
    /// - DispatchError::Rejected if the executor refused the payload
    /// - DispatchError::InvariantViolation if the session was halted
    pub async fn submit(&mut self, payload: P) -> Result<JobId, DispatchError> {
        let id = {
            let mut guard = self.shared.lock_state();
            let state = &mut *guard;
            state.ensure_accepting()?;

            let id = state.pending.register(self.shared.time.now_millis());
            let pending = state.pending.len();
            state.report.observe_pending(pending);
            if pending > self.shared.window.upper_bound() {
                return Err(self.shared.halt(
                    state,
                    format!(
                        "pending set grew to {} (upper bound {})",
                        pending,
                        self.shared.window.upper_bound()
                    ),
                ));
            }
            id
        };

        let sink: Arc<dyn CompletionSink<R>> = self.shared.clone();
        let notifier = CompletionNotifier::new(id, sink);
        if let Err(source) = self.executor.submit(WorkItem::new(id, payload), notifier) {
            self.shared.reject(id, &source);
            return Err(DispatchError::Rejected { id, source });
        }
        self.shared.mark_submitted(id);
        debug!(job_id = %id, "Job submitted");

        self.wait_for_window().await?;
        Ok(id)
    }

    async fn wait_for_window(&self) -> Result<(), DispatchError> {
        let window = self.shared.window;
        let full = {
            let state = self.shared.lock_state();
            window.is_full(state.pending.len()) && !state.cancelled
        };

        if full {
            debug!(
                session_id = %self.shared.session_id,
                upper_bound = window.upper_bound(),
                "Window full, suspending submission"
            );
            self.shared
                .wait_until(move |state| {
                    state.halted.is_some() || state.cancelled || window.has_room(state.pending.len())
                })
                .await;
            debug!(session_id = %self.shared.session_id, "Window reopened");
        }

        match self.shared.lock_state().halted_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Deliver a completion directly (same path executors use via their notifier)
    pub fn on_completion(&self, id: JobId, outcome: Result<R, ExecutionError>) {
        self.shared.complete(id, outcome);
    }

    /// Wait until every submitted job has reached a terminal state
    ///
    /// # Errors
    /// - DispatchError::InvariantViolation if the session was halted
    pub async fn drain(&mut self) -> Result<DispatchReport, DispatchError> {
        info!(session_id = %self.shared.session_id, pending = self.pending_len(), "Draining in-flight jobs");
        self.shared
            .wait_until(|state| state.halted.is_some() || state.pending.is_empty())
            .await;
        self.finish_drain()
    }

    /// Like `drain`, but gives up at `deadline`
    ///
    /// Jobs still pending at the deadline become `Abandoned` and are passed to
    /// the handler; their late completions are ignored. The returned report
    /// reflects the partial aggregate.
    pub async fn drain_with_deadline(&mut self, deadline: Duration) -> Result<DispatchReport, DispatchError> {
        info!(
            session_id = %self.shared.session_id,
            pending = self.pending_len(),
            deadline_ms = deadline.as_millis() as u64,
            "Draining in-flight jobs with deadline"
        );
        let drained = tokio::time::timeout(
            deadline,
            self.shared
                .wait_until(|state| state.halted.is_some() || state.pending.is_empty()),
        )
        .await;

        if drained.is_err() {
            self.shared
                .abandon_remaining(&format!("drain deadline of {:?} expired", deadline));
        }
        self.finish_drain()
    }

    fn finish_drain(&self) -> Result<DispatchReport, DispatchError> {
        let state = self.shared.lock_state();
        if let Some(err) = state.halted_error() {
            return Err(err);
        }
        let report = self.shared.snapshot(&state);
        info!(
            session_id = %report.session_id,
            submitted = report.submitted,
            completed = report.completed,
            failed = report.failed,
            abandoned = report.abandoned,
            duplicates = report.duplicates,
            "Dispatch session drained"
        );
        Ok(report)
    }

    /// Stop submitting; jobs already handed to the executor still finish
    pub fn cancel_remaining(&self) {
        let mut state = self.shared.lock_state();
        self.shared.cancel_locked(&mut state, "cancel_remaining called");
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            target: self.shared.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.lock_state().cancelled
    }

    pub fn pending_len(&self) -> usize {
        self.shared.lock_state().pending.len()
    }

    pub fn report(&self) -> DispatchReport {
        let state = self.shared.lock_state();
        self.shared.snapshot(&state)
    }

    /// Read the handler's aggregate state under the dispatcher lock
    pub fn with_handler<T>(&self, f: impl FnOnce(&H) -> T) -> T {
        let state = self.shared.lock_state();
        f(&state.handler)
    }
}
