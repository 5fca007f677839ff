//! Embedded cron scheduler built on a hierarchical timing wheel
//!
//! # Features
//!
//! - **Cron patterns**: 5/6/7-field expressions with ranges, steps, lists,
//!   month/weekday names and `L` (last day of month); `matches` and
//!   `next_match` with a bounded search that rejects unsatisfiable patterns
//! - **Scheduler**: concurrent task registry, per-second pulse, at-most-one
//!   dispatch per task per matched second, graceful or immediate stop
//! - **Timing wheel**: O(1) amortized insertion and advance, overflow levels
//!   for long delays, bounded single-tick jitter, cancellation handles
//! - **Observability**: structured `tracing` throughout; task failures and
//!   panics are reported to listeners, never to the driver
//!
//! # Example
//!
//! ```no_run
//! use cronwheel::{Scheduler, SchedulerConfig};
//!
//! #[tokio::main]
//! async fn main() -> cronwheel::Result<()> {
//!     let scheduler = Scheduler::new(SchedulerConfig::default())?;
//!
//!     let id = scheduler.schedule("*/5 * * * * *", || async {
//!         println!("tick");
//!         Ok(())
//!     })?;
//!
//!     scheduler.start(false).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(12)).await;
//!     scheduler.remove(&id)?;
//!     scheduler.stop(true).await?;
//!     Ok(())
//! }
//! ```

pub mod pattern;
pub mod scheduler;
pub mod timer;

mod error;

pub use error::{Error, Result};
pub use pattern::{CronPattern, PatternError};
pub use scheduler::{
    Scheduler, SchedulerConfig, SchedulerConfigBuilder, SchedulerError, SchedulerState,
    TaskId, TaskListener, TaskResult,
};
pub use timer::{SystemTimer, TimerConfig, TimerError, TimerTaskHandle};
