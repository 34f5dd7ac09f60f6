//! TaskFunction - a task wrapping a one-shot closure

use async_trait::async_trait;

use super::{Task, TaskContext};
use crate::domain::DeletePolicy;

/// Runs `func` once and completes as soon as it returns.
pub struct TaskFunction<F> {
    name: String,
    policy: DeletePolicy,
    func: F,
}

impl<F> TaskFunction<F>
where
    F: FnOnce(&TaskContext) + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            policy: DeletePolicy::Deletable,
            func,
        }
    }

    pub fn with_policy(mut self, policy: DeletePolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl<F> Task for TaskFunction<F>
where
    F: FnOnce(&TaskContext) + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_policy(&self) -> DeletePolicy {
        self.policy
    }

    async fn run(self: Box<Self>, ctx: TaskContext) {
        let Self { func, .. } = *self;
        func(&ctx);
    }
}
