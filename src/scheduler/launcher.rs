//! Per-second launchers and their bookkeeping

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::trace;

use super::core::SchedulerCore;

/// One unit of per-second work: scan the task table against a single instant
///
/// Created per pulse, bound to that pulse's second boundary, destroyed when
/// the scan finishes.
pub(crate) struct TaskLauncher {
    millis: i64,
    core: Arc<SchedulerCore>,
}

impl TaskLauncher {
    fn run(self) {
        trace!(millis = self.millis, "launcher scanning task table");
        self.core
            .task_table()
            .execute_matching(&self.core, self.millis);
    }
}

/// Tracks outstanding launchers so a graceful stop can drain them
pub(crate) struct TaskLauncherManager {
    active: AtomicUsize,
    idle: Notify,
}

impl TaskLauncherManager {
    pub(crate) fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// Spawn a launcher for one second boundary
    pub(crate) fn spawn(self: &Arc<Self>, core: Arc<SchedulerCore>, millis: i64) {
        self.active.fetch_add(1, Ordering::AcqRel);
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            TaskLauncher { millis, core }.run();
            manager.finish();
        });
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Block until no launcher is in flight
    pub(crate) async fn wait_idle(&self) {
        loop {
            if self.active() == 0 {
                return;
            }
            let notified = self.idle.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish(&self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}
