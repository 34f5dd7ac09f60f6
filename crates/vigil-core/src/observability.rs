//! Snapshot views of the scheduler for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DeletePolicy, TaskId};

/// Counters taken under one lock, so they are consistent with each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerCounts {
    /// Tasks waiting in the main queue.
    pub queued: usize,

    /// 0 or 1.
    pub running: usize,

    /// Tasks still running after `force_delete_tasks()` let go of them.
    pub detached: usize,

    pub run_now_in_flight: usize,

    /// Tasks that finished since the scheduler was created, from any lane.
    pub completed: u64,
}

/// A queued task as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTaskView {
    pub id: TaskId,
    pub name: String,
    pub policy: DeletePolicy,
    pub scheduled_at: DateTime<Utc>,
}
