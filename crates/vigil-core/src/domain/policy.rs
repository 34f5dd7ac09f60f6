//! Deletion policy of a task.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a deletion sweep may do with a task that has not started yet.
///
/// | policy | `delete_tasks()` | `force_delete_tasks()` |
/// |---|---|---|
/// | `Deletable` | dropped | dropped |
/// | `NonDeletable` | kept in place | dropped |
/// | `Reschedulable` | moved behind the kept tasks | dropped |
///
/// A running task is never touched by either sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    #[default]
    Deletable,

    /// Must run once queued, e.g. a device removal that the control plane
    /// has to see to stay consistent.
    NonDeletable,

    /// Survives `delete_tasks()` but loses its queue position.
    Reschedulable,
}

impl DeletePolicy {
    /// Policy of a composite task.
    ///
    /// Any `NonDeletable` child wins, then any `Reschedulable` one.
    /// An empty set is `Deletable`.
    pub fn combine<I>(policies: I) -> DeletePolicy
    where
        I: IntoIterator<Item = DeletePolicy>,
    {
        let mut combined = DeletePolicy::Deletable;
        for policy in policies {
            match policy {
                DeletePolicy::NonDeletable => return DeletePolicy::NonDeletable,
                DeletePolicy::Reschedulable => combined = DeletePolicy::Reschedulable,
                DeletePolicy::Deletable => {}
            }
        }
        combined
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeletePolicy::Deletable => "deletable",
            DeletePolicy::NonDeletable => "non_deletable",
            DeletePolicy::Reschedulable => "reschedulable",
        };
        f.write_str(s)
    }
}
