// Job Domain Model

use serde::{Deserialize, Serialize};

/// Job ID (monotonic per dispatch session, starts at 1, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub const FIRST: JobId = JobId(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Next id in the session sequence
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job Status
///
/// `Created -> Submitted -> {Completed | Failed | Cancelled | Abandoned}`.
/// A job that the executor finishes before `submit` returns goes straight
/// from `Created` to its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Submitted,
    Completed,
    Failed,
    Cancelled,
    Abandoned,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Created | JobStatus::Submitted)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Created => write!(f, "CREATED"),
            JobStatus::Submitted => write!(f, "SUBMITTED"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Cancelled => write!(f, "CANCELLED"),
            JobStatus::Abandoned => write!(f, "ABANDONED"),
        }
    }
}

/// Unit of work handed to an executor
#[derive(Debug, Clone)]
pub struct WorkItem<P> {
    pub id: JobId,
    pub payload: P,
}

impl<P> WorkItem<P> {
    pub fn new(id: JobId, payload: P) -> Self {
        Self { id, payload }
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// Dispatcher-side view of one job
#[derive(Debug, Clone)]
pub struct JobHandle<R> {
    pub id: JobId,
    pub status: JobStatus,
    /// Present only when status == Completed
    pub result: Option<R>,
    /// Failure indicator reported by the executor (Failed/Cancelled/Abandoned)
    pub failure: Option<String>,

    pub created_at: i64, // epoch ms
    pub submitted_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl<R> JobHandle<R> {
    /// Create a new handle in the `Created` state
    pub fn new(id: JobId, created_at: i64) -> Self {
        Self {
            id,
            status: JobStatus::Created,
            result: None,
            failure: None,
            created_at,
            submitted_at: None,
            completed_at: None,
        }
    }

    /// Executor accepted the payload
    pub fn mark_submitted(&mut self, now_millis: i64) -> crate::domain::error::Result<()> {
        if self.status != JobStatus::Created {
            return Err(self.invalid_transition(JobStatus::Submitted));
        }
        self.status = JobStatus::Submitted;
        self.submitted_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Completed with the executor's result
    pub fn complete(&mut self, result: R, now_millis: i64) -> crate::domain::error::Result<()> {
        self.finish(JobStatus::Completed, now_millis)?;
        self.result = Some(result);
        Ok(())
    }

    /// Transition to Failed (executor reported a failure)
    pub fn fail(&mut self, reason: impl Into<String>, now_millis: i64) -> crate::domain::error::Result<()> {
        self.finish(JobStatus::Failed, now_millis)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// Transition to Cancelled (executor cancelled the job)
    pub fn cancel(&mut self, reason: impl Into<String>, now_millis: i64) -> crate::domain::error::Result<()> {
        self.finish(JobStatus::Cancelled, now_millis)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// Transition to Abandoned (rejected at submit, or given up at a drain deadline)
    pub fn abandon(&mut self, reason: impl Into<String>, now_millis: i64) -> crate::domain::error::Result<()> {
        self.finish(JobStatus::Abandoned, now_millis)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall time between submission and completion, if both are known
    pub fn latency_ms(&self) -> Option<i64> {
        match (self.submitted_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    fn finish(&mut self, to: JobStatus, now_millis: i64) -> crate::domain::error::Result<()> {
        if self.is_terminal() {
            return Err(self.invalid_transition(to));
        }
        // completed before the submit path could record it
        if self.submitted_at.is_none() && to != JobStatus::Abandoned {
            self.submitted_at = Some(now_millis);
        }
        self.status = to;
        self.completed_at = Some(now_millis);
        Ok(())
    }

    fn invalid_transition(&self, to: JobStatus) -> crate::domain::DomainError {
        crate::domain::DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
