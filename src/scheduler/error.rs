//! Error types for the scheduler module

use uuid::Uuid;

use crate::pattern::PatternError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur in scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("scheduler already started")]
    AlreadyStarted,

    /// Operation requires a running scheduler
    #[error("scheduler is not running")]
    NotRunning,

    /// A task with this id is already registered
    #[error("task already exists: {0}")]
    TaskAlreadyExists(Uuid),

    /// No task registered under this id
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    /// Invalid cron expression or timezone
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Underlying timer failure
    #[error(transparent)]
    Timer(#[from] crate::timer::TimerError),
}
