//! TaskScheduler - 単一実行の FIFO タスクキュー
//!
//! # 不変条件
//! - At most one task from the main queue runs at any time.
//! - Queued tasks start in the order they were scheduled.
//! - Only a completion (or new scheduling) advances the queue.
//! - `schedule_task_now` tasks bypass the queue and never touch its state.
//!
//! # 実行モデル
//! Each started task is driven by one spawned tokio future. The bookkeeping
//! lock is a `std::sync::Mutex` and is never held across an `.await`.
//! On a current-thread runtime this is a single-threaded cooperative loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, info_span};

use super::handle::{TaskHandle, TaskOutcome};
use crate::domain::{TaskId, TaskState};
use crate::observability::{QueuedTaskView, SchedulerCounts};
use crate::queue::{RunQueue, TaskRecord};
use crate::task::{Task, TaskContext};

/// Cheap to clone; all clones share one queue.
///
/// # Panics
/// Scheduling spawns onto the current tokio runtime and panics outside one.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<SchedulerState>,

    /// Woken whenever a task finishes or a sweep ran.
    changed: Notify,
}

#[derive(Default)]
struct SchedulerState {
    queue: RunQueue,
    running: Option<RunningTask>,

    /// Bumped by `force_delete_tasks`. A queue task started under an older
    /// epoch no longer owns the running slot.
    epoch: u64,
    detached: usize,
    run_now_in_flight: usize,
    completed: u64,
}

struct RunningTask {
    id: TaskId,
    name: String,
}

/// Where a started task came from, and so what its completion releases.
#[derive(Debug, Clone, Copy)]
enum Lane {
    Queue { epoch: u64 },
    RunNow,
}

impl SchedulerState {
    /// Claim the running slot for the head of the queue, if both are free.
    fn take_next(&mut self) -> Option<(TaskRecord, Lane)> {
        if self.running.is_some() {
            return None;
        }
        let record = self.queue.pop_front()?;
        self.running = Some(RunningTask {
            id: record.id,
            name: record.name.clone(),
        });
        Some((record, Lane::Queue { epoch: self.epoch }))
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && self.running.is_none()
            && self.run_now_in_flight == 0
            && self.detached == 0
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState::default()),
                changed: Notify::new(),
            }),
        }
    }

    /// Append `task` to the queue. Starts it right away if nothing is running.
    pub fn schedule_task<T: Task + 'static>(&self, task: T) -> TaskHandle {
        self.schedule_boxed(Box::new(task))
    }

    pub fn schedule_boxed(&self, task: Box<dyn Task>) -> TaskHandle {
        let (record, handle) = TaskRecord::new(task);
        debug!(id = %record.id, name = %record.name, policy = %record.policy, "task scheduled");

        let next = {
            let mut state = self.lock();
            state.queue.push_back(record);
            state.take_next()
        };
        if let Some((record, lane)) = next {
            self.spawn(record, lane);
        }
        handle
    }

    /// Run `task` immediately, outside the queue.
    ///
    /// Ordering against queued tasks is given up. Use it only for work that
    /// does not depend on queued or in-flight state.
    pub fn schedule_task_now<T: Task + 'static>(&self, task: T) -> TaskHandle {
        self.schedule_boxed_now(Box::new(task))
    }

    pub fn schedule_boxed_now(&self, task: Box<dyn Task>) -> TaskHandle {
        let (record, handle) = TaskRecord::new(task);
        debug!(id = %record.id, name = %record.name, "task scheduled to run now");

        self.lock().run_now_in_flight += 1;
        self.spawn(record, Lane::RunNow);
        handle
    }

    /// Drop queued `Deletable` tasks. The running task is left alone.
    ///
    /// `NonDeletable` tasks keep their position; `Reschedulable` ones move
    /// behind them.
    pub fn delete_tasks(&self) {
        let (removed, remaining) = {
            let mut state = self.lock();
            let removed = state.queue.delete_tasks();
            (removed, state.queue.len())
        };
        info!(removed = removed.len(), remaining, "deleted queued tasks");

        for record in removed {
            record.discard();
        }
        self.inner.changed.notify_waiters();
    }

    /// Drop every queued task and detach the running one.
    ///
    /// The running task is not cancelled. It runs to completion, but its
    /// completion no longer advances the queue; tasks scheduled after this
    /// call start immediately.
    pub fn force_delete_tasks(&self) {
        let (removed, detached) = {
            let mut state = self.lock();
            let removed = state.queue.force_delete();
            state.epoch = state.epoch.wrapping_add(1);
            let detached = state.running.take();
            if detached.is_some() {
                state.detached += 1;
            }
            (removed, detached)
        };

        match &detached {
            Some(task) => info!(
                removed = removed.len(),
                detached_id = %task.id,
                detached_name = %task.name,
                "force-deleted tasks, running task detached"
            ),
            None => info!(removed = removed.len(), "force-deleted tasks"),
        }

        for record in removed {
            record.discard();
        }
        self.inner.changed.notify_waiters();
    }

    pub fn counts(&self) -> SchedulerCounts {
        let state = self.lock();
        SchedulerCounts {
            queued: state.queue.len(),
            running: usize::from(state.running.is_some()),
            detached: state.detached,
            run_now_in_flight: state.run_now_in_flight,
            completed: state.completed,
        }
    }

    /// Queued (not started) tasks in the order they will run.
    pub fn queued_tasks(&self) -> Vec<QueuedTaskView> {
        self.lock().queue.views()
    }

    pub fn running_task_name(&self) -> Option<String> {
        self.lock().running.as_ref().map(|t| t.name.clone())
    }

    /// Resolve once the queue is empty and no task of any lane is running.
    ///
    /// A task that never completes keeps this pending forever.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Start the head of the queue if nothing is running.
    fn maybe_run_next(&self) {
        let next = self.lock().take_next();
        if let Some((record, lane)) = next {
            self.spawn(record, lane);
        }
    }

    fn spawn(&self, record: TaskRecord, lane: Lane) {
        let TaskRecord {
            id,
            name,
            task,
            completion,
            ..
        } = record;

        completion.mark_running();
        let ctx = TaskContext::new(id, name.clone(), self.clone());
        let scheduler = self.clone();
        let span = info_span!("task", %id, name = %name);

        tokio::spawn(
            async move {
                debug!(?lane, "task started");
                let outcome = match AssertUnwindSafe(task.run(ctx)).catch_unwind().await {
                    Ok(()) => {
                        debug!("task completed");
                        TaskOutcome::Completed
                    }
                    Err(panic) => {
                        error!(panic = %panic_message(panic.as_ref()), "task panicked");
                        TaskOutcome::Panicked
                    }
                };

                // キューを進めてからハンドルに通知する
                scheduler.finish(lane);
                completion.finish(outcome);
            }
            .instrument(span),
        );
    }

    /// Bookkeeping after a task's future resolved.
    fn finish(&self, lane: Lane) {
        let advance = {
            let mut state = self.lock();
            state.completed += 1;
            match lane {
                Lane::RunNow => {
                    state.run_now_in_flight = state.run_now_in_flight.saturating_sub(1);
                    false
                }
                Lane::Queue { epoch } if epoch == state.epoch => {
                    state.running = None;
                    true
                }
                Lane::Queue { .. } => {
                    debug!("detached task completed");
                    state.detached = state.detached.saturating_sub(1);
                    false
                }
            }
        };

        if advance {
            self.maybe_run_next();
        }
        self.inner.changed.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("counts", &self.counts())
            .finish()
    }
}

impl TaskScheduler {
    /// `None` once the task left the queue's bookkeeping (finished, deleted,
    /// detached, or run outside the queue).
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        let state = self.lock();
        if state.running.as_ref().is_some_and(|t| t.id == id) {
            return Some(TaskState::Running);
        }
        state
            .queue
            .iter()
            .any(|r| r.id == id)
            .then_some(TaskState::NotStarted)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
