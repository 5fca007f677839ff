//! Hierarchical timing wheel and its background driver
//!
//! The timer fires arbitrary numbers of delayed one-shot callbacks with O(1)
//! amortized insertion and advance cost. Tasks hash into tick-resolution
//! buckets; deadlines beyond a wheel's span overflow into a coarser wheel and
//! cascade back down as they approach. Only buckets with content enter the
//! delay queue, so a tick's work is proportional to what actually expired,
//! never to the total number of pending tasks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cronwheel::timer::{SystemTimer, TimerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let timer = Arc::new(SystemTimer::new(TimerConfig::default()));
//!     timer.start().await.unwrap();
//!
//!     let deadline = chrono::Utc::now().timestamp_millis() + 1_000;
//!     timer.add_task(deadline, Box::new(|| Box::pin(async {
//!         println!("fired");
//!     })));
//!
//!     tokio::time::sleep(Duration::from_millis(1_500)).await;
//!     timer.stop().await.unwrap();
//! }
//! ```

mod bucket;
mod clock;
mod delay_queue;
mod error;
mod system;
mod task;
mod wheel;

pub use error::{TimerError, TimerResult};
pub use system::{SystemTimer, TimerConfig, TimerState};
pub use task::{TimerAction, TimerTask, TimerTaskHandle};

pub(crate) use clock::wall_clock_ms;
