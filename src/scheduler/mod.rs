//! Cron task scheduling
//!
//! A [`Scheduler`] owns a concurrent [`TaskTable`] and, while running, drives
//! a per-second pulse off the timing wheel: every wall-clock second boundary
//! a launcher scans the table for patterns matching that instant and hands
//! the matching task bodies to the tokio worker pool. Task failures are
//! confined to the dispatch boundary and reported through [`TaskListener`]s.
//!
//! # Example
//!
//! ```no_run
//! use cronwheel::scheduler::{Scheduler, SchedulerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new(SchedulerConfig::default())?;
//!     scheduler.schedule("*/10 * * * * *", || async {
//!         println!("every ten seconds");
//!         Ok(())
//!     })?;
//!
//!     scheduler.start(false).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     scheduler.stop(true).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod executor;
mod launcher;
mod listener;
mod table;
mod task;

pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use core::{Scheduler, SchedulerState};
pub use error::{SchedulerError, SchedulerResult};
pub use listener::TaskListener;
pub use table::TaskTable;
pub use task::{boxed_task, TaskFn, TaskId, TaskResult};
