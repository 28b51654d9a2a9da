// Dispatch session counters

use crate::domain::JobStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a dispatch session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub session_id: Uuid,
    /// Jobs the executor accepted
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Given up at a drain deadline
    pub abandoned: u64,
    /// Refused by the executor at submit time
    pub rejected: u64,
    /// Repeated or late completion notifications that were ignored
    pub duplicates: u64,
    /// Highest PendingSet size observed
    pub peak_pending: usize,
    /// PendingSet size when the snapshot was taken
    pub pending: usize,
    /// Submission was stopped before the payload stream ran out
    pub stopped_early: bool,
}

impl DispatchReport {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            submitted: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            abandoned: 0,
            rejected: 0,
            duplicates: 0,
            peak_pending: 0,
            pending: 0,
            stopped_early: false,
        }
    }

    /// Count a job that reached a terminal state
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Cancelled => self.cancelled += 1,
            JobStatus::Abandoned => self.abandoned += 1,
            JobStatus::Created | JobStatus::Submitted => {}
        }
    }

    pub fn observe_pending(&mut self, pending: usize) {
        self.peak_pending = self.peak_pending.max(pending);
    }

    /// Jobs that reached a terminal state after being accepted
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.cancelled + self.abandoned
    }
}
