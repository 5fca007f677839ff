//! One-shot timer tasks and their cancellation handles

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

/// Deferred action fired when a timer task expires
///
/// Consumed exactly once: either by the expiry path or by cancellation,
/// whichever claims it first.
pub type TimerAction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A delayed one-shot task inside the timing wheel
///
/// The task moves between buckets as it cascades from coarse wheel levels
/// toward the base wheel; buckets own the task (`Arc`) and cancellation is a
/// flag plus an action take, which unlinks in O(1) without touching the
/// bucket it currently sits in.
pub struct TimerTask {
    deadline_ms: i64,
    action: Mutex<Option<TimerAction>>,
    cancelled: AtomicBool,
}

impl TimerTask {
    pub(crate) fn new(deadline_ms: i64, action: TimerAction) -> Arc<Self> {
        Arc::new(Self {
            deadline_ms,
            action: Mutex::new(Some(action)),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Absolute expiry timestamp, aligned up to the timer's tick resolution
    pub fn deadline_ms(&self) -> i64 {
        self.deadline_ms
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Mark cancelled and discard the action
    ///
    /// Returns `true` if the task had not fired (or been cancelled) yet. A
    /// dispatch already in flight is not interrupted; the task just never
    /// fires again.
    pub(crate) fn cancel(&self) -> bool {
        self.cancelled.store(true, Ordering::Release);
        self.action.lock().take().is_some()
    }

    /// Claim the action for execution; `None` if cancelled or already fired
    pub(crate) fn take_action(&self) -> Option<TimerAction> {
        if self.is_cancelled() {
            return None;
        }
        self.action.lock().take()
    }
}

impl std::fmt::Debug for TimerTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerTask")
            .field("deadline_ms", &self.deadline_ms)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle returned by [`SystemTimer::add_task`](super::SystemTimer::add_task)
#[derive(Clone)]
pub struct TimerTaskHandle {
    task: Arc<TimerTask>,
}

impl TimerTaskHandle {
    pub(crate) fn new(task: Arc<TimerTask>) -> Self {
        Self { task }
    }

    /// Prevent the task from firing; `true` if it had not fired yet
    pub fn cancel(&self) -> bool {
        self.task.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    pub fn deadline_ms(&self) -> i64 {
        self.task.deadline_ms()
    }
}
