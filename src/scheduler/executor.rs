//! Task execution on the worker pool

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{abortable, AbortHandle};
use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error};
use uuid::Uuid;

use super::core::SchedulerCore;
use super::task::{TaskFn, TaskId};

/// Dispatches task bodies and tracks the in-flight set
///
/// Each fire runs as its own tokio task, so a slow body never stalls the
/// pulse driver. Errors and panics are absorbed here, reported to listeners,
/// and go no further. The abort handle is registered before the body can
/// run, so bookkeeping stays exact even for bodies that finish instantly.
pub(crate) struct TaskExecutorManager {
    running: DashMap<Uuid, AbortHandle>,
    idle: Notify,
}

impl TaskExecutorManager {
    pub(crate) fn new() -> Self {
        Self {
            running: DashMap::new(),
            idle: Notify::new(),
        }
    }

    pub(crate) fn dispatch(&self, core: &Arc<SchedulerCore>, id: TaskId, task: TaskFn) {
        let execution_id = Uuid::new_v4();
        core.listeners().notify_start(&id);

        let body_core = Arc::clone(core);
        let body = async move {
            let outcome = AssertUnwindSafe(task()).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => {
                    debug!(task_id = %id, "task completed");
                    body_core.listeners().notify_succeeded(&id);
                }
                Ok(Err(message)) => {
                    error!(task_id = %id, error = %message, "task failed");
                    body_core.listeners().notify_failed(&id, &message);
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    error!(task_id = %id, error = %message, "task panicked");
                    body_core.listeners().notify_failed(&id, &message);
                }
            }
        };

        let (body, abort_handle) = abortable(body);
        self.running.insert(execution_id, abort_handle);

        let finish_core = Arc::clone(core);
        tokio::spawn(async move {
            if body.await.is_err() {
                debug!(task_id = %id, "task aborted");
            }
            finish_core.executors().finish(&execution_id);
        });
    }

    pub(crate) fn running(&self) -> usize {
        self.running.len()
    }

    /// Block until every dispatched body has finished
    pub(crate) async fn wait_idle(&self) {
        loop {
            if self.running.is_empty() {
                return;
            }
            let notified = self.idle.notified();
            if self.running.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Abort everything in flight (daemon / non-waiting stop)
    ///
    /// Entries are cleaned up by each aborted body's finish path, so the
    /// in-flight set stays consistent across a later restart.
    pub(crate) fn abort_all(&self) {
        for entry in self.running.iter() {
            entry.value().abort();
        }
    }

    fn finish(&self, execution_id: &Uuid) {
        self.running.remove(execution_id);
        self.idle.notify_waiters();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
