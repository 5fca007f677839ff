//! Integration tests for the scheduler

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cronwheel::scheduler::{
    Scheduler, SchedulerConfig, SchedulerError, SchedulerState, TaskId, TaskListener,
};

fn scheduler() -> Scheduler {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    Scheduler::new(SchedulerConfig::default()).expect("default config is valid")
}

#[tokio::test]
async fn test_lifecycle() {
    let scheduler = scheduler();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    scheduler.start(false).await.expect("start");
    assert!(scheduler.is_running());
    assert!(matches!(
        scheduler.start(false).await,
        Err(SchedulerError::AlreadyStarted)
    ));

    scheduler.stop(true).await.expect("stop");
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(matches!(
        scheduler.stop(true).await,
        Err(SchedulerError::NotRunning)
    ));
}

#[tokio::test]
async fn test_table_registration_scenario() {
    let scheduler = scheduler();

    let a = scheduler
        .schedule("*/10 * * * * *", || async { Ok(()) })
        .expect("schedule a");
    let b = scheduler
        .schedule("*/20 * * * * *", || async { Ok(()) })
        .expect("schedule b");
    let c = scheduler
        .schedule("*/30 * * * * *", || async { Ok(()) })
        .expect("schedule c");

    assert_eq!(scheduler.len(), 3);
    assert_eq!(scheduler.task_ids(), vec![a, b, c]);

    scheduler
        .update_pattern(&c, "*/15 * * * * *")
        .expect("update");
    assert_eq!(
        scheduler.pattern(&c),
        Some("*/15 * * * * *".parse().unwrap())
    );
    assert_eq!(
        scheduler.pattern(&a),
        Some("*/10 * * * * *".parse().unwrap())
    );
    assert_eq!(
        scheduler.pattern(&b),
        Some("*/20 * * * * *".parse().unwrap())
    );

    scheduler.remove(&b).expect("remove");
    assert_eq!(scheduler.len(), 2);
    assert!(scheduler.pattern(&b).is_none());

    scheduler.clear();
    assert!(scheduler.is_empty());
}

#[tokio::test]
async fn test_registration_errors() {
    let scheduler = scheduler();

    assert!(matches!(
        scheduler.schedule("not a cron", || async { Ok(()) }),
        Err(SchedulerError::Pattern(_))
    ));

    let id = TaskId::new_v4();
    scheduler
        .schedule_with_id(id, "* * * * * *", || async { Ok(()) })
        .expect("first add");
    assert!(matches!(
        scheduler.schedule_with_id(id, "* * * * * *", || async { Ok(()) }),
        Err(SchedulerError::TaskAlreadyExists(_))
    ));

    let missing = TaskId::new_v4();
    assert!(matches!(
        scheduler.remove(&missing),
        Err(SchedulerError::TaskNotFound(_))
    ));
    assert!(matches!(
        scheduler.update_pattern(&missing, "* * * * * *"),
        Err(SchedulerError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn test_every_second_task_fires() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    let capture = counter.clone();
    scheduler
        .schedule("* * * * * *", move || {
            let counter = capture.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .expect("schedule");

    scheduler.start(false).await.expect("start");
    tokio::time::sleep(Duration::from_millis(3_300)).await;
    scheduler.stop(true).await.expect("stop");

    let count = counter.load(Ordering::SeqCst);
    assert!(count >= 2, "expected at least 2 fires, got {count}");
    // At most one dispatch per second boundary inside the window
    assert!(count <= 4, "expected at most 4 fires, got {count}");
}

#[tokio::test]
async fn test_failing_task_does_not_disturb_others() {
    let scheduler = scheduler();

    let good = Arc::new(AtomicUsize::new(0));
    let capture = good.clone();
    scheduler
        .schedule("* * * * * *", move || {
            let good = capture.clone();
            async move {
                good.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .expect("schedule good");

    scheduler
        .schedule("* * * * * *", || async {
            Err("intentional failure".to_string())
        })
        .expect("schedule failing");

    scheduler
        .schedule("* * * * * *", || async { panic!("intentional panic") })
        .expect("schedule panicking");

    scheduler.start(false).await.expect("start");
    tokio::time::sleep(Duration::from_millis(2_300)).await;
    scheduler.stop(true).await.expect("stop");

    assert!(
        good.load(Ordering::SeqCst) >= 1,
        "healthy task should keep firing alongside failing ones"
    );
}

#[derive(Default)]
struct RecordingListener {
    started: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl TaskListener for RecordingListener {
    fn on_start(&self, _id: &TaskId) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_succeeded(&self, _id: &TaskId) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }
    fn on_failed(&self, _id: &TaskId, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_listener_sees_success_and_failure() {
    let scheduler = scheduler();
    let listener = Arc::new(RecordingListener::default());
    scheduler.add_listener(listener.clone());

    scheduler
        .schedule("* * * * * *", || async { Ok(()) })
        .expect("schedule ok task");
    scheduler
        .schedule("* * * * * *", || async { Err("boom".to_string()) })
        .expect("schedule failing task");

    scheduler.start(false).await.expect("start");
    tokio::time::sleep(Duration::from_millis(2_300)).await;
    scheduler.stop(true).await.expect("stop");

    assert!(listener.started.load(Ordering::SeqCst) >= 2);
    assert!(listener.succeeded.load(Ordering::SeqCst) >= 1);
    assert!(listener.failed.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_removed_task_stops_firing() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    let capture = counter.clone();
    let id = scheduler
        .schedule("* * * * * *", move || {
            let counter = capture.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .expect("schedule");

    scheduler.start(false).await.expect("start");
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    scheduler.remove(&id).expect("remove");

    let at_removal = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(2_200)).await;
    scheduler.stop(true).await.expect("stop");

    let final_count = counter.load(Ordering::SeqCst);
    assert!(
        final_count <= at_removal + 1,
        "task kept firing after removal: {at_removal} -> {final_count}"
    );
}

#[tokio::test]
async fn test_stop_wait_drains_in_flight_task() {
    let scheduler = scheduler();
    let started = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicBool::new(false));

    let started_capture = started.clone();
    let completed_capture = completed.clone();
    scheduler
        .schedule("* * * * * *", move || {
            let started = started_capture.clone();
            let completed = completed_capture.clone();
            async move {
                started.store(true, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(600)).await;
                completed.store(true, Ordering::SeqCst);
                Ok(())
            }
        })
        .expect("schedule");

    scheduler.start(false).await.expect("start");
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    scheduler.stop(true).await.expect("stop");
    assert!(
        completed.load(Ordering::SeqCst),
        "stop(wait = true) must drain the in-flight body"
    );
}

#[tokio::test]
async fn test_stop_without_wait_aborts_in_flight_task() {
    let scheduler = scheduler();
    let started = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicBool::new(false));

    let started_capture = started.clone();
    let completed_capture = completed.clone();
    scheduler
        .schedule("* * * * * *", move || {
            let started = started_capture.clone();
            let completed = completed_capture.clone();
            async move {
                started.store(true, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                completed.store(true, Ordering::SeqCst);
                Ok(())
            }
        })
        .expect("schedule");

    scheduler.start(false).await.expect("start");
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let stopping = Instant::now();
    scheduler.stop(false).await.expect("stop");
    assert!(
        stopping.elapsed() < Duration::from_secs(2),
        "stop(wait = false) must not block on the task body"
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(
        !completed.load(Ordering::SeqCst),
        "aborted body must not complete"
    );
}

#[tokio::test]
async fn test_daemon_mode_ignores_wait() {
    let scheduler = scheduler();
    let started = Arc::new(AtomicBool::new(false));

    let started_capture = started.clone();
    scheduler
        .schedule("* * * * * *", move || {
            let started = started_capture.clone();
            async move {
                started.store(true, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        })
        .expect("schedule");

    scheduler.start(true).await.expect("start daemon");
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let stopping = Instant::now();
    scheduler.stop(true).await.expect("stop");
    assert!(
        stopping.elapsed() < Duration::from_secs(2),
        "daemon mode must not wait for task bodies"
    );
}

#[tokio::test]
async fn test_set_daemon_rejected_while_running() {
    let scheduler = scheduler();
    scheduler.set_daemon(true).expect("settable before start");
    scheduler.set_daemon(false).expect("settable before start");

    scheduler.start(false).await.expect("start");
    assert!(matches!(
        scheduler.set_daemon(true),
        Err(SchedulerError::AlreadyStarted)
    ));
    scheduler.stop(true).await.expect("stop");
}

#[tokio::test]
async fn test_tasks_survive_stop_and_restart() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    let capture = counter.clone();
    scheduler
        .schedule("* * * * * *", move || {
            let counter = capture.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .expect("schedule");

    scheduler.start(false).await.expect("start");
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    scheduler.stop(true).await.expect("stop");
    assert_eq!(scheduler.len(), 1, "stop must not clear the table");

    let before_restart = counter.load(Ordering::SeqCst);
    scheduler.start(false).await.expect("restart");
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    scheduler.stop(true).await.expect("stop again");
    assert!(
        counter.load(Ordering::SeqCst) > before_restart,
        "task should fire again after a restart"
    );
}
