//! Task representation for scheduled jobs

use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

/// Unique identifier for a scheduled task
pub type TaskId = Uuid;

/// Outcome of one task execution; errors are reported to listeners
pub type TaskResult = Result<(), String>;

/// A schedulable task body
///
/// Shared so overlapping fires of the same task can run concurrently on the
/// worker pool.
pub type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, TaskResult> + Send + Sync>;

/// Wrap an async closure into a [`TaskFn`]
pub fn boxed_task<F, Fut>(f: F) -> TaskFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = TaskResult> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}
