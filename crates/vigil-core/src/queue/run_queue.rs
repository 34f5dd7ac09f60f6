//! Pending FIFO of not-yet-started tasks.

use std::collections::VecDeque;

use super::TaskRecord;
use crate::domain::DeletePolicy;
use crate::observability::QueuedTaskView;

/// Strict FIFO. The running task is never in here.
#[derive(Debug, Default)]
pub struct RunQueue {
    pending: VecDeque<TaskRecord>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, record: TaskRecord) {
        self.pending.push_back(record);
    }

    pub fn pop_front(&mut self) -> Option<TaskRecord> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.pending.iter()
    }

    /// Remove `Deletable` tasks and return them.
    ///
    /// `NonDeletable` tasks keep their place. `Reschedulable` tasks survive but
    /// move, in their relative order, behind every kept `NonDeletable` task.
    pub fn delete_tasks(&mut self) -> Vec<TaskRecord> {
        let mut kept = VecDeque::with_capacity(self.pending.len());
        let mut moved = Vec::new();
        let mut removed = Vec::new();

        for record in self.pending.drain(..) {
            match record.policy {
                DeletePolicy::Deletable => removed.push(record),
                DeletePolicy::NonDeletable => kept.push_back(record),
                DeletePolicy::Reschedulable => moved.push(record),
            }
        }

        kept.extend(moved);
        self.pending = kept;
        removed
    }

    /// Remove every task regardless of policy and return them.
    pub fn force_delete(&mut self) -> Vec<TaskRecord> {
        self.pending.drain(..).collect()
    }

    pub fn views(&self) -> Vec<QueuedTaskView> {
        self.pending.iter().map(TaskRecord::view).collect()
    }
}
