// Completion handlers that fold job results into an aggregate

use crate::application::dispatcher::{CompletionHandler, Flow};
use crate::domain::{JobHandle, JobId, JobStatus};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Completion handler with a reportable aggregate
pub trait Aggregate<R>: CompletionHandler<R> {
    type Outcome: Serialize + Send;

    /// Current aggregate value
    fn outcome(&self) -> Self::Outcome;

    /// Jobs that ended Failed, Cancelled or Abandoned
    fn failures(&self) -> u64;
}

fn is_failure<R>(job: &JobHandle<R>) -> bool {
    job.status != JobStatus::Completed
}

/// Total of a numeric projection over all completed jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumOutcome {
    pub total: u64,
    /// Completed jobs that contributed to `total`
    pub successes: u64,
    /// `total` hit u64::MAX and stopped counting
    #[serde(default)]
    pub overflowed: bool,
}

/// Adds `value(result)` for every completed job
///
/// Stops the session only if the total would overflow u64; the total then
/// stays at u64::MAX and the outcome is flagged.
pub struct SumReduction<F> {
    value: F,
    total: u64,
    successes: u64,
    failures: u64,
    overflowed: bool,
}

impl<F> SumReduction<F> {
    pub fn new(value: F) -> Self {
        Self {
            value,
            total: 0,
            successes: 0,
            failures: 0,
            overflowed: false,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

impl<R, F> CompletionHandler<R> for SumReduction<F>
where
    F: Fn(&R) -> u64 + Send + 'static,
{
    fn on_completion(&mut self, job: &JobHandle<R>) -> Flow {
        match &job.result {
            Some(result) => {
                let value = (self.value)(result);
                self.successes += 1;
                match self.total.checked_add(value) {
                    Some(total) => self.total = total,
                    None => {
                        error!(job_id = %job.id, total = self.total, value = value, "Sum overflowed u64");
                        self.total = u64::MAX;
                        self.overflowed = true;
                        return Flow::Stop;
                    }
                }
            }
            None if is_failure(job) => self.failures += 1,
            None => {}
        }
        Flow::Continue
    }
}

impl<R, F> Aggregate<R> for SumReduction<F>
where
    F: Fn(&R) -> u64 + Send + 'static,
{
    type Outcome = SumOutcome;

    fn outcome(&self) -> SumOutcome {
        SumOutcome {
            total: self.total,
            successes: self.successes,
            overflowed: self.overflowed,
        }
    }

    fn failures(&self) -> u64 {
        self.failures
    }
}

/// First accepted answer and the job that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Found<T> {
    pub job_id: JobId,
    pub value: T,
}

/// Stops the session on the first result `accept` maps to `Some`
///
/// Whichever completion takes the dispatcher lock first wins. Later successes
/// from jobs already in flight are counted but never replace the answer.
pub struct FirstSuccess<F, T> {
    accept: F,
    found: Option<Found<T>>,
    extra_successes: u64,
    failures: u64,
}

impl<F, T> FirstSuccess<F, T> {
    pub fn new(accept: F) -> Self {
        Self {
            accept,
            found: None,
            extra_successes: 0,
            failures: 0,
        }
    }

    pub fn found(&self) -> Option<&Found<T>> {
        self.found.as_ref()
    }

    pub fn extra_successes(&self) -> u64 {
        self.extra_successes
    }
}

impl<R, F, T> CompletionHandler<R> for FirstSuccess<F, T>
where
    F: Fn(&R) -> Option<T> + Send + 'static,
    T: Send + 'static,
{
    fn on_completion(&mut self, job: &JobHandle<R>) -> Flow {
        let Some(result) = &job.result else {
            if is_failure(job) {
                self.failures += 1;
            }
            return Flow::Continue;
        };
        let Some(value) = (self.accept)(result) else {
            return Flow::Continue;
        };

        if self.found.is_some() {
            self.extra_successes += 1;
            return Flow::Continue;
        }
        info!(job_id = %job.id, "Goal reached");
        self.found = Some(Found { job_id: job.id, value });
        Flow::Stop
    }
}

impl<R, F, T> Aggregate<R> for FirstSuccess<F, T>
where
    F: Fn(&R) -> Option<T> + Send + 'static,
    T: Clone + Serialize + Send + 'static,
{
    type Outcome = Option<Found<T>>;

    fn outcome(&self) -> Option<Found<T>> {
        self.found.clone()
    }

    fn failures(&self) -> u64 {
        self.failures
    }
}

/// Keeps every value `select` maps to `Some`, in completion order
pub struct CollectSuccesses<F, T> {
    select: F,
    values: Vec<T>,
    failures: u64,
}

impl<F, T> CollectSuccesses<F, T> {
    pub fn new(select: F) -> Self {
        Self {
            select,
            values: Vec::new(),
            failures: 0,
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<R, F, T> CompletionHandler<R> for CollectSuccesses<F, T>
where
    F: Fn(&R) -> Option<T> + Send + 'static,
    T: Send + 'static,
{
    fn on_completion(&mut self, job: &JobHandle<R>) -> Flow {
        match &job.result {
            Some(result) => {
                if let Some(value) = (self.select)(result) {
                    self.values.push(value);
                }
            }
            None if is_failure(job) => self.failures += 1,
            None => {}
        }
        Flow::Continue
    }
}

impl<R, F, T> Aggregate<R> for CollectSuccesses<F, T>
where
    F: Fn(&R) -> Option<T> + Send + 'static,
    T: Clone + Serialize + Send + 'static,
{
    type Outcome = Vec<T>;

    fn outcome(&self) -> Vec<T> {
        self.values.clone()
    }

    fn failures(&self) -> u64 {
        self.failures
    }
}
