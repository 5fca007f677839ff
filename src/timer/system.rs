//! Background driver around the timing wheel

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::clock::{align_up, wall_clock_ms};
use super::delay_queue::DelayQueue;
use super::error::{TimerError, TimerResult};
use super::task::{TimerAction, TimerTask, TimerTaskHandle};
use super::wheel::TimingWheel;

/// Configuration for a [`SystemTimer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Base wheel resolution in milliseconds
    pub tick_ms: i64,

    /// Buckets per wheel level
    pub wheel_size: usize,

    /// Upper bound on one delay-queue poll inside the driver loop
    pub delay_queue_timeout: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            wheel_size: 20,
            delay_queue_timeout: Duration::from_millis(100),
        }
    }
}

/// Driver lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TimerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl TimerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => TimerState::Starting,
            2 => TimerState::Running,
            3 => TimerState::Stopping,
            _ => TimerState::Stopped,
        }
    }
}

/// Hierarchical-wheel timer with a background driver task
///
/// `add_task` registers an absolute-deadline one-shot action; the driver polls
/// the delay queue with a bounded timeout and advances the wheel, executing
/// expired tasks on the tokio worker pool. The wheel can also be driven
/// manually through [`SystemTimer::advance_clock`] when no driver is running.
pub struct SystemTimer {
    wheel: TimingWheel,
    queue: Arc<DelayQueue>,

    /// Poll bound read by the driver each iteration, adjustable at runtime
    delay_queue_timeout_ms: AtomicU64,

    /// add_task takes the read side, bucket flushes take the write side, so a
    /// task's move between buckets appears atomic to concurrent inserters
    flush_lock: RwLock<()>,

    state: AtomicU8,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl SystemTimer {
    pub fn new(config: TimerConfig) -> Self {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(
            config.tick_ms,
            config.wheel_size,
            wall_clock_ms(),
            Arc::clone(&queue),
        );
        Self {
            wheel,
            queue,
            delay_queue_timeout_ms: AtomicU64::new(config.delay_queue_timeout.as_millis() as u64),
            flush_lock: RwLock::new(()),
            state: AtomicU8::new(TimerState::Stopped as u8),
            driver: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TimerState {
        TimerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Adjust the driver's delay-queue poll bound
    pub fn set_delay_queue_timeout(&self, timeout: Duration) {
        self.delay_queue_timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Release);
    }

    /// Live tasks currently held by the wheel hierarchy
    pub fn pending_tasks(&self) -> usize {
        self.wheel.pending()
    }

    /// Register a one-shot action for an absolute deadline
    ///
    /// The deadline is aligned up to the tick resolution, so the action fires
    /// within `[deadline, deadline + tick_ms)` — never early. A deadline
    /// already in the past executes immediately.
    pub fn add_task(&self, deadline_ms: i64, action: TimerAction) -> TimerTaskHandle {
        let aligned = align_up(deadline_ms, self.wheel.tick_ms());
        let task = TimerTask::new(aligned, action);
        trace!(deadline_ms, aligned, "timer task added");
        self.add_entry(Arc::clone(&task));
        TimerTaskHandle::new(task)
    }

    /// Advance the wheel by processing the next expired bucket, waiting at
    /// most `timeout`; returns whether any bucket was flushed
    pub async fn advance_clock(&self, timeout: Duration) -> bool {
        let Some(first) = self.queue.poll(timeout).await else {
            return false;
        };

        let mut bucket = first;
        loop {
            let expiration = bucket.expiration();
            let drained = {
                let _flush = self.flush_lock.write();
                self.wheel.advance(expiration);
                bucket.drain()
            };
            trace!(expiration, tasks = drained.len(), "bucket flushed");
            for task in drained {
                self.add_entry(task);
            }

            match self.queue.try_poll(wall_clock_ms()) {
                Some(next) => bucket = next,
                None => break,
            }
        }
        true
    }

    /// Spawn the background driver
    pub async fn start(self: &Arc<Self>) -> TimerResult<()> {
        self.transition(TimerState::Stopped, TimerState::Starting)
            .map_err(|_| TimerError::AlreadyStarted)?;
        self.state
            .store(TimerState::Running as u8, Ordering::Release);

        let timer = Arc::clone(self);
        let handle = tokio::spawn(async move {
            debug!("timer driver started");
            while timer.state() == TimerState::Running {
                let timeout =
                    Duration::from_millis(timer.delay_queue_timeout_ms.load(Ordering::Acquire));
                timer.advance_clock(timeout).await;
            }
            debug!("timer driver exited");
        });
        *self.driver.lock() = Some(handle);

        info!("system timer started");
        Ok(())
    }

    /// Stop the driver, letting an in-flight bucket flush complete
    pub async fn stop(&self) -> TimerResult<()> {
        self.transition(TimerState::Running, TimerState::Stopping)
            .map_err(|_| TimerError::NotRunning)?;

        self.queue.wake();
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "timer driver join failed");
            }
        }

        self.state
            .store(TimerState::Stopped as u8, Ordering::Release);
        info!("system timer stopped");
        Ok(())
    }

    /// Insert or, when already expired, execute a task
    fn add_entry(&self, task: Arc<TimerTask>) {
        if task.is_cancelled() {
            return;
        }
        let fits = {
            let _insert = self.flush_lock.read();
            self.wheel.add(&task)
        };
        if !fits {
            self.execute(task);
        }
    }

    fn execute(&self, task: Arc<TimerTask>) {
        if let Some(action) = task.take_action() {
            trace!(deadline_ms = task.deadline_ms(), "timer task fired");
            tokio::spawn(action());
        }
    }

    fn transition(&self, from: TimerState, to: TimerState) -> Result<(), u8> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }
}

impl std::fmt::Debug for SystemTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemTimer")
            .field("state", &self.state())
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
