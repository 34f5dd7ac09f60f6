//! Task lifecycle state.

use serde::{Deserialize, Serialize};

/// Task state as seen by the scheduler.
///
/// State transitions:
/// - NotStarted -> Running -> Completed
///
/// Failure is not a state here: a task that failed at its own level still
/// completes. Completion is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Queued, `run()` not yet invoked.
    NotStarted,

    /// `run()` invoked, completion not yet observed.
    Running,

    Completed,
}
