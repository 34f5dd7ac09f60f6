//! TaskHandle - completion contract returned by the scheduler.

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};

use crate::domain::{TaskId, TaskState};

/// How a scheduled task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// `run()` returned. Task-level failures also end here.
    Completed,

    /// `run()` panicked. The scheduler moved on as if it completed.
    Panicked,

    /// Dropped before it started (deletion sweep, or the scheduler went away).
    Deleted,
}

/// Observes one scheduled task.
///
/// Dropping the handle does not affect the task.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    name: String,
    state: watch::Receiver<TaskState>,
    outcome: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Wait until the task has finished or was dropped.
    pub async fn wait(self) -> TaskOutcome {
        self.outcome.await.unwrap_or(TaskOutcome::Deleted)
    }
}

/// Scheduler side of a `TaskHandle`.
#[derive(Debug)]
pub(crate) struct Completion {
    state: watch::Sender<TaskState>,
    outcome: oneshot::Sender<TaskOutcome>,
}

impl Completion {
    pub(crate) fn channel(id: TaskId, name: &str) -> (Completion, TaskHandle) {
        let (state_tx, state_rx) = watch::channel(TaskState::NotStarted);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        (
            Completion {
                state: state_tx,
                outcome: outcome_tx,
            },
            TaskHandle {
                id,
                name: name.to_owned(),
                state: state_rx,
                outcome: outcome_rx,
            },
        )
    }

    pub(crate) fn mark_running(&self) {
        self.state.send_replace(TaskState::Running);
    }

    pub(crate) fn finish(self, outcome: TaskOutcome) {
        if outcome != TaskOutcome::Deleted {
            self.state.send_replace(TaskState::Completed);
        }
        // 受け手がいなくても問題ない
        let _ = self.outcome.send(outcome);
    }
}
