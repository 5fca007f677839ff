//! Error types for the timer module

/// Result type for timer operations
pub type TimerResult<T> = std::result::Result<T, TimerError>;

/// Errors that can occur driving the system timer
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimerError {
    /// `start` called while the driver is already running
    #[error("timer already started")]
    AlreadyStarted,

    /// `stop` called while the driver is not running
    #[error("timer is not running")]
    NotRunning,

    /// The driver task ended abnormally during shutdown
    #[error("timer driver failed to shut down: {0}")]
    ShutdownFailed(String),
}
