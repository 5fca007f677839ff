//! Wheel buckets: groups of timer tasks sharing an expiration window

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::task::TimerTask;

/// Sentinel for a bucket that currently represents no time window
const NO_EXPIRATION: i64 = -1;

/// One slot of a wheel level
///
/// Holds the tasks whose deadlines fall into this slot's current window. The
/// `expiration` is reused as the wheel revolves; re-arming it is what tells
/// the delay queue the bucket has content again.
pub(crate) struct TimerTaskList {
    tasks: Mutex<Vec<Arc<TimerTask>>>,
    expiration: AtomicI64,
}

impl TimerTaskList {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            tasks: Mutex::new(Vec::new()),
            expiration: AtomicI64::new(NO_EXPIRATION),
        })
    }

    pub(crate) fn add(&self, task: Arc<TimerTask>) {
        self.tasks.lock().push(task);
    }

    /// Arm the bucket for a new window; `true` if the expiration changed and
    /// the bucket therefore needs to be (re)offered to the delay queue
    pub(crate) fn set_expiration(&self, expiration_ms: i64) -> bool {
        self.expiration.swap(expiration_ms, Ordering::AcqRel) != expiration_ms
    }

    pub(crate) fn expiration(&self) -> i64 {
        self.expiration.load(Ordering::Acquire)
    }

    /// Take all tasks out and disarm the bucket
    ///
    /// Cancelled tasks are dropped here rather than handed back; everything
    /// else is returned for the caller to cascade or execute. Ownership
    /// transfers on the way out, so a task is never in two buckets at once.
    pub(crate) fn drain(&self) -> Vec<Arc<TimerTask>> {
        let mut tasks = self.tasks.lock();
        let drained = tasks
            .drain(..)
            .filter(|task| !task.is_cancelled())
            .collect();
        self.expiration.store(NO_EXPIRATION, Ordering::Release);
        drained
    }

    /// Number of live (non-cancelled) tasks currently in the bucket
    pub(crate) fn pending(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| !task.is_cancelled())
            .count()
    }
}
