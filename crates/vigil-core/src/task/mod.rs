//! Task - 非同期の作業単位
//!
//! # 構成
//! - **Task**: the trait the scheduler runs (`run` consumes the task)
//! - **TaskContext**: what a running task knows about itself and its scheduler
//! - **TaskFunction**: one-shot closure task
//! - **TaskGroup**: runs children concurrently, completes when all did
//! - **ApiCallTask**: one control-plane request with its own timeout

pub mod api_call;
pub mod function;
pub mod group;

pub use self::api_call::ApiCallTask;
pub use self::function::TaskFunction;
pub use self::group::TaskGroup;

use async_trait::async_trait;

use crate::app::TaskScheduler;
use crate::domain::{DeletePolicy, TaskId};

/// A unit of asynchronous work, typically one or more network calls.
///
/// # 使用例
/// ```ignore
/// struct RemoveDevice { device: String, api: Arc<dyn RequestTransport> }
///
/// #[async_trait]
/// impl Task for RemoveDevice {
///     fn name(&self) -> &str { "remove_device" }
///     fn delete_policy(&self) -> DeletePolicy { DeletePolicy::NonDeletable }
///     async fn run(self: Box<Self>, _ctx: TaskContext) {
///         let _ = self.api.send(ApiRequest::delete(format!("/device/{}", self.device))).await;
///     }
/// }
/// ```
///
/// `run` takes the task by value: it runs at most once and cannot be reused.
/// The returned future resolving is the completion signal, whether the work
/// succeeded or not. Reporting failures is the task's own job.
#[async_trait]
pub trait Task: Send {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::Deletable
    }

    async fn run(self: Box<Self>, ctx: TaskContext);
}

/// Handed to a task when it starts.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    name: String,
    scheduler: TaskScheduler,
}

impl TaskContext {
    pub(crate) fn new(id: TaskId, name: impl Into<String>, scheduler: TaskScheduler) -> Self {
        Self {
            id,
            name: name.into(),
            scheduler,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scheduler running this task. Follow-up work may be scheduled here.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Context for a sub-task running as part of this one.
    pub(crate) fn child(&self, name: &str) -> TaskContext {
        TaskContext::new(TaskId::new(), name, self.scheduler.clone())
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
