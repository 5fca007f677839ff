//! Crate-level error type

use thiserror::Error;

/// Any error produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    /// Cron expression or timezone errors
    #[error(transparent)]
    Pattern(#[from] crate::pattern::PatternError),

    /// Scheduler lifecycle and registry errors
    #[error(transparent)]
    Scheduler(#[from] crate::scheduler::SchedulerError),

    /// Timer driver errors
    #[error(transparent)]
    Timer(#[from] crate::timer::TimerError),
}

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;
