// PendingSet - jobs handed to the executor whose completion is not yet observed

use crate::domain::{JobHandle, JobId};
use std::collections::HashMap;

pub struct PendingSet<R> {
    jobs: HashMap<JobId, JobHandle<R>>,
    next_id: JobId,
}

impl<R> Default for PendingSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PendingSet<R> {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            next_id: JobId::FIRST,
        }
    }

    /// Assign the next id and record a `Created` handle for it
    pub fn register(&mut self, now_millis: i64) -> JobId {
        let id = self.next_id;
        self.next_id = id.next();
        self.jobs.insert(id, JobHandle::new(id, now_millis));
        id
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut JobHandle<R>> {
        self.jobs.get_mut(&id)
    }

    /// Remove a job whose completion has been observed
    pub fn take(&mut self, id: JobId) -> Option<JobHandle<R>> {
        self.jobs.remove(&id)
    }

    /// True if `id` was handed out by this set, pending or not
    pub fn was_issued(&self, id: JobId) -> bool {
        id >= JobId::FIRST && id < self.next_id
    }

    /// Remove every pending job, oldest first
    pub fn take_all(&mut self) -> Vec<JobHandle<R>> {
        let mut handles: Vec<JobHandle<R>> = self.jobs.drain().map(|(_, handle)| handle).collect();
        handles.sort_by_key(|handle| handle.id);
        handles
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobStatus;

    #[test]
    fn test_register_and_take() {
        let mut pending: PendingSet<u64> = PendingSet::new();
        let first = pending.register(10);
        let second = pending.register(20);

        assert_eq!(first, JobId::new(1));
        assert_eq!(second, JobId::new(2));
        assert_eq!(pending.len(), 2);

        let handle = pending.take(first).unwrap();
        assert_eq!(handle.status, JobStatus::Created);
        assert_eq!(handle.created_at, 10);
        assert!(pending.take(first).is_none());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut pending: PendingSet<()> = PendingSet::new();
        let first = pending.register(0);
        pending.take(first);
        let second = pending.register(0);
        assert_ne!(first, second);
        assert!(pending.was_issued(first));
        assert!(pending.was_issued(second));
        assert!(!pending.was_issued(JobId::new(3)));
        assert!(!pending.was_issued(JobId::new(0)));
    }

    #[test]
    fn test_take_all_is_ordered() {
        let mut pending: PendingSet<()> = PendingSet::new();
        for _ in 0..5 {
            pending.register(0);
        }
        pending.take(JobId::new(2));

        let ids: Vec<u64> = pending.take_all().iter().map(|h| h.id.value()).collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
        assert!(pending.is_empty());
    }
}
