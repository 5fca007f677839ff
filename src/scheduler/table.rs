//! Concurrent registry of scheduled tasks

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::core::SchedulerCore;
use super::error::{SchedulerError, SchedulerResult};
use super::task::{TaskFn, TaskId};
use crate::pattern::CronPattern;

/// One registered task
pub(crate) struct TaskEntry {
    pattern: RwLock<CronPattern>,
    task: TaskFn,

    /// Wall-clock second of the last claimed dispatch; overlapping launcher
    /// ticks race on this to guarantee at most one fire per matched second
    last_fired_second: AtomicI64,
}

/// Registry mapping task ids to their pattern and body
///
/// Lookups are O(1) through the concurrent map; ordered views (`ids`) are
/// O(n) snapshots of the insertion order. Scans iterate such a snapshot, so
/// structural changes during a scan never panic it — entries removed mid-scan
/// are simply skipped.
pub struct TaskTable {
    entries: DashMap<TaskId, Arc<TaskEntry>>,
    order: RwLock<Vec<TaskId>>,
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Register a task; a duplicate id is rejected
    pub(crate) fn add(&self, id: TaskId, pattern: CronPattern, task: TaskFn) -> SchedulerResult<()> {
        match self.entries.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(SchedulerError::TaskAlreadyExists(id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(TaskEntry {
                    pattern: RwLock::new(pattern),
                    task,
                    last_fired_second: AtomicI64::new(-1),
                }));
                self.order.write().push(id);
                Ok(())
            }
        }
    }

    pub(crate) fn remove(&self, id: &TaskId) -> SchedulerResult<()> {
        self.entries
            .remove(id)
            .ok_or(SchedulerError::TaskNotFound(*id))?;
        self.order.write().retain(|existing| existing != id);
        Ok(())
    }

    /// Swap a task's pattern in place; in-flight scans see either the old or
    /// the new pattern, never a torn one
    pub(crate) fn update_pattern(&self, id: &TaskId, pattern: CronPattern) -> SchedulerResult<()> {
        let entry = self
            .entries
            .get(id)
            .ok_or(SchedulerError::TaskNotFound(*id))?;
        *entry.pattern.write() = pattern;
        Ok(())
    }

    pub fn pattern(&self, id: &TaskId) -> Option<CronPattern> {
        self.entries.get(id).map(|entry| entry.pattern.read().clone())
    }

    pub fn task(&self, id: &TaskId) -> Option<TaskFn> {
        self.entries.get(id).map(|entry| Arc::clone(&entry.task))
    }

    /// Registered ids in insertion order
    pub fn ids(&self) -> Vec<TaskId> {
        self.order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
        self.order.write().clear();
    }

    /// Scan every registered task against a second-truncated instant and
    /// dispatch the matches
    ///
    /// The per-entry `fetch_max` claim makes concurrent calls for the same
    /// second (overlapping launcher ticks) dispatch each task at most once.
    pub(crate) fn execute_matching(&self, core: &Arc<SchedulerCore>, millis: i64) {
        let second = millis.div_euclid(1000);
        let tz = core.timezone();
        let match_second = core.match_second();
        let match_year = core.match_year();

        for id in self.ids() {
            let Some(entry) = self.entries.get(&id).map(|e| Arc::clone(&e)) else {
                continue;
            };
            if entry.last_fired_second.fetch_max(second, Ordering::AcqRel) >= second {
                continue;
            }
            if entry
                .pattern
                .read()
                .matches(tz, millis, match_second, match_year)
            {
                debug!(task_id = %id, second, "task matched");
                core.dispatch(id, Arc::clone(&entry.task));
            }
        }
    }
}
