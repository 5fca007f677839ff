//! Core scheduler implementation

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use chrono_tz::Tz;
use parking_lot::Mutex;
use tracing::{info, warn};

use super::config::SchedulerConfig;
use super::error::{SchedulerError, SchedulerResult};
use super::executor::TaskExecutorManager;
use super::launcher::TaskLauncherManager;
use super::listener::{TaskListener, TaskListenerManager};
use super::table::TaskTable;
use super::task::{boxed_task, TaskFn, TaskId, TaskResult};
use crate::pattern::CronPattern;
use crate::timer::wall_clock_ms;
use crate::timer::{SystemTimer, TimerConfig};

/// Scheduler lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SchedulerState::Starting,
            2 => SchedulerState::Running,
            3 => SchedulerState::Stopping,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Cron task scheduler
///
/// Owns a [`TaskTable`] for its lifetime and, while running, a
/// [`SystemTimer`] whose wheel drives a self-re-arming pulse at every
/// wall-clock second boundary. Each pulse spawns a launcher that scans the
/// table and dispatches matching task bodies onto the tokio worker pool, so
/// a slow task can never stall the pulse.
///
/// Cloning is cheap and shares the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<SchedulerCore>,
}

impl Scheduler {
    /// Build a scheduler; fails if the configured timezone is unknown
    pub fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        let timezone = config.resolve_timezone()?;
        Ok(Self {
            core: Arc::new(SchedulerCore {
                timezone,
                match_second: AtomicBool::new(config.match_second),
                match_year: AtomicBool::new(config.match_year),
                daemon: AtomicBool::new(config.daemon),
                timer_config: config.timer,
                state: AtomicU8::new(SchedulerState::Stopped as u8),
                table: TaskTable::new(),
                listeners: TaskListenerManager::new(),
                launchers: Arc::new(TaskLauncherManager::new()),
                executors: TaskExecutorManager::new(),
                timer: Mutex::new(None),
            }),
        })
    }

    // --------------------------------------------------------- registration

    /// Register a task under a fresh id
    pub fn schedule<F, Fut>(&self, expr: &str, f: F) -> SchedulerResult<TaskId>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let id = TaskId::new_v4();
        self.schedule_with_id(id, expr, f)?;
        Ok(id)
    }

    /// Register a task under an explicit id; a duplicate id is rejected
    pub fn schedule_with_id<F, Fut>(&self, id: TaskId, expr: &str, f: F) -> SchedulerResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let pattern: CronPattern = expr.parse()?;
        self.core.table.add(id, pattern, boxed_task(f))?;
        info!(task_id = %id, pattern = %expr, "task scheduled");
        Ok(())
    }

    /// Unregister a task; a dispatch already in flight is not interrupted
    pub fn remove(&self, id: &TaskId) -> SchedulerResult<()> {
        self.core.table.remove(id)?;
        info!(task_id = %id, "task descheduled");
        Ok(())
    }

    /// Replace a task's cron pattern
    pub fn update_pattern(&self, id: &TaskId, expr: &str) -> SchedulerResult<()> {
        let pattern: CronPattern = expr.parse()?;
        self.core.table.update_pattern(id, pattern)?;
        info!(task_id = %id, pattern = %expr, "task pattern updated");
        Ok(())
    }

    pub fn pattern(&self, id: &TaskId) -> Option<CronPattern> {
        self.core.table.pattern(id)
    }

    /// Registered ids in insertion order
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.core.table.ids()
    }

    pub fn len(&self) -> usize {
        self.core.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.table.is_empty()
    }

    /// Drop every registered task
    pub fn clear(&self) {
        self.core.table.clear();
    }

    /// The live task table; mutations through the scheduler are visible here
    pub fn task_table(&self) -> &TaskTable {
        &self.core.table
    }

    /// Task bodies currently executing on the worker pool
    pub fn running_tasks(&self) -> usize {
        self.core.executors.running()
    }

    // --------------------------------------------------------- listeners

    pub fn add_listener(&self, listener: Arc<dyn TaskListener>) {
        self.core.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TaskListener>) -> bool {
        self.core.listeners.remove(listener)
    }

    // --------------------------------------------------------- toggles

    /// Toggle second-field matching
    pub fn set_match_second(&self, enabled: bool) {
        self.core.match_second.store(enabled, Ordering::Release);
    }

    /// Toggle year-field matching
    pub fn set_match_year(&self, enabled: bool) {
        self.core.match_year.store(enabled, Ordering::Release);
    }

    /// Preset daemon mode; rejected once the scheduler has started
    pub fn set_daemon(&self, enabled: bool) -> SchedulerResult<()> {
        if self.state() != SchedulerState::Stopped {
            return Err(SchedulerError::AlreadyStarted);
        }
        self.core.daemon.store(enabled, Ordering::Release);
        Ok(())
    }

    // --------------------------------------------------------- lifecycle

    pub fn state(&self) -> SchedulerState {
        self.core.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Start the pulse
    ///
    /// `daemon = true` makes every later `stop` abandon in-flight tasks
    /// instead of waiting for them.
    pub async fn start(&self, daemon: bool) -> SchedulerResult<()> {
        let core = &self.core;
        core.transition(SchedulerState::Stopped, SchedulerState::Starting)
            .map_err(|_| SchedulerError::AlreadyStarted)?;
        core.daemon.store(daemon, Ordering::Release);

        let timer = Arc::new(SystemTimer::new(core.timer_config.clone()));
        if let Err(err) = timer.start().await {
            core.state
                .store(SchedulerState::Stopped as u8, Ordering::Release);
            return Err(err.into());
        }
        *core.timer.lock() = Some(Arc::clone(&timer));

        core.state
            .store(SchedulerState::Running as u8, Ordering::Release);
        SchedulerCore::arm_pulse(core, &timer, next_second_boundary(wall_clock_ms()));

        info!(daemon, tasks = core.table.len(), "scheduler started");
        Ok(())
    }

    /// Stop the pulse
    ///
    /// `wait = true` blocks until in-flight launchers and task bodies finish
    /// (unless daemon mode is on); otherwise outstanding bodies are aborted.
    /// Registered tasks survive a stop; call [`Scheduler::clear`] to drop
    /// them.
    pub async fn stop(&self, wait: bool) -> SchedulerResult<()> {
        let core = &self.core;
        core.transition(SchedulerState::Running, SchedulerState::Stopping)
            .map_err(|_| SchedulerError::NotRunning)?;

        let timer = core.timer.lock().take();
        if let Some(timer) = timer {
            if let Err(err) = timer.stop().await {
                warn!(error = %err, "timer did not stop cleanly");
            }
        }

        if wait && !core.daemon.load(Ordering::Acquire) {
            core.launchers.wait_idle().await;
            core.executors.wait_idle().await;
        } else {
            core.executors.abort_all();
        }

        core.state
            .store(SchedulerState::Stopped as u8, Ordering::Release);
        info!(waited = wait, "scheduler stopped");
        Ok(())
    }
}

/// Shared scheduler internals
pub(crate) struct SchedulerCore {
    timezone: Tz,
    match_second: AtomicBool,
    match_year: AtomicBool,
    daemon: AtomicBool,
    timer_config: TimerConfig,
    state: AtomicU8,
    table: TaskTable,
    listeners: TaskListenerManager,
    launchers: Arc<TaskLauncherManager>,
    executors: TaskExecutorManager,
    timer: Mutex<Option<Arc<SystemTimer>>>,
}

impl SchedulerCore {
    pub(crate) fn timezone(&self) -> Tz {
        self.timezone
    }

    pub(crate) fn match_second(&self) -> bool {
        self.match_second.load(Ordering::Acquire)
    }

    pub(crate) fn match_year(&self) -> bool {
        self.match_year.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn task_table(&self) -> &TaskTable {
        &self.table
    }

    pub(crate) fn listeners(&self) -> &TaskListenerManager {
        &self.listeners
    }

    pub(crate) fn launchers(&self) -> &Arc<TaskLauncherManager> {
        &self.launchers
    }

    pub(crate) fn executors(&self) -> &TaskExecutorManager {
        &self.executors
    }

    /// Hand a matched task body to the worker pool
    pub(crate) fn dispatch(self: &Arc<Self>, id: TaskId, task: TaskFn) {
        if self.state() != SchedulerState::Running {
            return;
        }
        self.executors.dispatch(self, id, task);
    }

    fn transition(&self, from: SchedulerState, to: SchedulerState) -> Result<(), u8> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// Arm the pulse task for one second boundary; each fire re-arms the next
    ///
    /// The action holds only weak references, so dropping the scheduler (or
    /// stopping the timer) lets the chain die instead of keeping the core
    /// alive forever.
    fn arm_pulse(core: &Arc<Self>, timer: &Arc<SystemTimer>, at_ms: i64) {
        let weak_core = Arc::downgrade(core);
        let weak_timer = Arc::downgrade(timer);
        timer.add_task(
            at_ms,
            Box::new(move || {
                Box::pin(async move {
                    let Some(core) = weak_core.upgrade() else {
                        return;
                    };
                    if core.state() != SchedulerState::Running {
                        return;
                    }
                    core.launchers().spawn(Arc::clone(&core), at_ms);
                    if let Some(timer) = weak_timer.upgrade() {
                        SchedulerCore::arm_pulse(
                            &core,
                            &timer,
                            next_second_boundary(wall_clock_ms()),
                        );
                    }
                })
            }),
        );
    }
}

/// First second boundary strictly after `ms`
fn next_second_boundary(ms: i64) -> i64 {
    (ms.div_euclid(1000) + 1) * 1000
}
