//! Task record: a queued task plus its bookkeeping.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::app::handle::Completion;
use crate::app::{TaskHandle, TaskOutcome};
use crate::domain::{DeletePolicy, TaskId};
use crate::observability::QueuedTaskView;
use crate::task::Task;

/// A task owned by the scheduler.
///
/// Design:
/// - name and policy are read once at scheduling time, so sweeps never call
///   into the task.
/// - The record is consumed when the task starts or is dropped by a sweep.
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub policy: DeletePolicy,

    /// For diagnostics only; order comes from queue position.
    pub scheduled_at: DateTime<Utc>,

    pub(crate) task: Box<dyn Task>,
    pub(crate) completion: Completion,
}

impl TaskRecord {
    pub fn new(task: Box<dyn Task>) -> (Self, TaskHandle) {
        let id = TaskId::new();
        let name = task.name().to_owned();
        let (completion, handle) = Completion::channel(id, &name);

        let record = Self {
            id,
            policy: task.delete_policy(),
            name,
            scheduled_at: Utc::now(),
            task,
            completion,
        };
        (record, handle)
    }

    pub fn view(&self) -> QueuedTaskView {
        QueuedTaskView {
            id: self.id,
            name: self.name.clone(),
            policy: self.policy,
            scheduled_at: self.scheduled_at,
        }
    }

    /// Drop the task without running it.
    pub fn discard(self) {
        debug!(id = %self.id, name = %self.name, "queued task deleted");
        self.completion.finish(TaskOutcome::Deleted);
    }
}

impl std::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("scheduled_at", &self.scheduled_at)
            .finish_non_exhaustive()
    }
}
