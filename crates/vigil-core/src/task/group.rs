//! TaskGroup - several tasks scheduled as one

use std::panic::{AssertUnwindSafe, resume_unwind};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, error};

use super::{Task, TaskContext};
use crate::domain::DeletePolicy;

/// Runs every child concurrently and completes once all of them completed.
///
/// The group occupies a single slot in the queue. Its delete policy is
/// `DeletePolicy::combine` over the children.
///
/// A panicking child does not cancel its siblings. The first panic is
/// re-raised once every child finished.
pub struct TaskGroup {
    name: String,
    tasks: Vec<Box<dyn Task>>,
}

impl TaskGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_task<T: Task + 'static>(mut self, task: T) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    pub fn push(&mut self, task: Box<dyn Task>) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl Task for TaskGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::combine(self.tasks.iter().map(|t| t.delete_policy()))
    }

    async fn run(self: Box<Self>, ctx: TaskContext) {
        let Self { tasks, .. } = *self;
        debug!(children = tasks.len(), "running task group");

        let runs = tasks.into_iter().map(|task| {
            let name = task.name().to_owned();
            let child = ctx.child(&name);
            async move {
                let result = AssertUnwindSafe(task.run(child)).catch_unwind().await;
                (name, result)
            }
        });

        let mut first_panic = None;
        for (name, result) in join_all(runs).await {
            if let Err(panic) = result {
                error!(child = %name, "task group child panicked");
                first_panic.get_or_insert(panic);
            }
        }
        if let Some(panic) = first_panic {
            resume_unwind(panic);
        }
    }
}
