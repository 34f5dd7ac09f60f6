//! LogErrorSink - reports task failures through `tracing`

use tracing::warn;

use crate::error::NetworkError;
use crate::ports::ErrorSink;

/// Default `ErrorSink`: logs and moves on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, task_name: &str, error: &NetworkError) {
        warn!(task = task_name, %error, "task request failed");
    }
}
