//! ErrorSink port - where tasks report failures they do not handle themselves.

use crate::error::NetworkError;

/// Receives task-level failures.
///
/// The scheduler never sees these; it only learns that the task completed.
pub trait ErrorSink: Send + Sync {
    fn report(&self, task_name: &str, error: &NetworkError);
}
