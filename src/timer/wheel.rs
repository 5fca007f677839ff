//! Hierarchical timing wheel
//!
//! Classic hashed-wheel layout: `wheel_size` buckets of `tick_ms` resolution
//! cover a span of `interval = tick_ms * wheel_size`; deadlines beyond the
//! span land in a lazily built overflow wheel whose tick is the whole span,
//! recursively. Advancing moves `current_time` in tick-aligned steps and is
//! O(1) per level; expired overflow buckets cascade their tasks back down
//! into finer wheels as their windows approach.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use super::bucket::TimerTaskList;
use super::clock::align_down;
use super::delay_queue::DelayQueue;
use super::task::TimerTask;

pub(crate) struct TimingWheel {
    tick_ms: i64,
    wheel_size: usize,
    interval: i64,
    current_time: AtomicI64,
    buckets: Vec<Arc<TimerTaskList>>,
    queue: Arc<DelayQueue>,
    overflow: OnceLock<Box<TimingWheel>>,
}

impl TimingWheel {
    pub(crate) fn new(
        tick_ms: i64,
        wheel_size: usize,
        start_ms: i64,
        queue: Arc<DelayQueue>,
    ) -> Self {
        let buckets = (0..wheel_size).map(|_| TimerTaskList::new()).collect();
        Self {
            tick_ms,
            wheel_size,
            interval: tick_ms * wheel_size as i64,
            current_time: AtomicI64::new(align_down(start_ms, tick_ms)),
            buckets,
            queue,
            overflow: OnceLock::new(),
        }
    }

    pub(crate) fn tick_ms(&self) -> i64 {
        self.tick_ms
    }

    pub(crate) fn current_time(&self) -> i64 {
        self.current_time.load(Ordering::Acquire)
    }

    /// Insert a task by deadline
    ///
    /// Returns `false` when the deadline falls inside the current tick (or in
    /// the past), meaning the caller must execute it instead of revolving it
    /// into a bogus future bucket. A task always ends up in exactly one
    /// bucket across the hierarchy.
    pub(crate) fn add(&self, task: &Arc<TimerTask>) -> bool {
        let deadline = task.deadline_ms();
        let current = self.current_time();

        if deadline < current + self.tick_ms {
            // Already expired for this wheel's resolution
            false
        } else if deadline < current + self.interval {
            let virtual_id = deadline.div_euclid(self.tick_ms);
            let bucket = &self.buckets[(virtual_id % self.wheel_size as i64) as usize];
            bucket.add(Arc::clone(task));

            let expiration = virtual_id * self.tick_ms;
            if bucket.set_expiration(expiration) {
                self.queue.offer(Arc::clone(bucket), expiration);
            }
            true
        } else {
            self.overflow_wheel().add(task)
        }
    }

    /// Move the wheel (and all coarser levels) forward to `time_ms`
    pub(crate) fn advance(&self, time_ms: i64) {
        let current = self.current_time();
        if time_ms >= current + self.tick_ms {
            self.current_time
                .store(align_down(time_ms, self.tick_ms), Ordering::Release);
            if let Some(overflow) = self.overflow.get() {
                overflow.advance(time_ms);
            }
        }
    }

    /// Live tasks across this level and all overflow levels
    pub(crate) fn pending(&self) -> usize {
        let own: usize = self.buckets.iter().map(|bucket| bucket.pending()).sum();
        own + self.overflow.get().map_or(0, |wheel| wheel.pending())
    }

    fn overflow_wheel(&self) -> &TimingWheel {
        self.overflow.get_or_init(|| {
            Box::new(TimingWheel::new(
                self.interval,
                self.wheel_size,
                self.current_time(),
                Arc::clone(&self.queue),
            ))
        })
    }

    #[cfg(test)]
    pub(crate) fn has_overflow(&self) -> bool {
        self.overflow.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::task::TimerAction;

    fn noop_action() -> TimerAction {
        Box::new(|| Box::pin(async {}))
    }

    #[test]
    fn test_past_deadline_rejected() {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(100, 20, 10_000, queue);
        let task = TimerTask::new(9_000, noop_action());
        assert!(!wheel.add(&task));
        let task = TimerTask::new(10_050, noop_action());
        assert!(!wheel.add(&task));
    }

    #[test]
    fn test_in_span_deadline_lands_in_bucket() {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(100, 20, 10_000, queue.clone());
        let task = TimerTask::new(10_500, noop_action());
        assert!(wheel.add(&task));
        assert!(!wheel.has_overflow());
        assert_eq!(wheel.pending(), 1);
        // The bucket was armed and queued exactly once
        assert_eq!(queue.len(), 1);
        let bucket = queue.try_poll(10_500).expect("armed bucket");
        assert_eq!(bucket.expiration(), 10_500);
    }

    #[test]
    fn test_same_window_arms_queue_once() {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(100, 20, 10_000, queue.clone());
        assert!(wheel.add(&TimerTask::new(10_500, noop_action())));
        assert!(wheel.add(&TimerTask::new(10_500, noop_action())));
        assert_eq!(wheel.pending(), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_beyond_span_allocates_overflow() {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(100, 20, 10_000, queue.clone());
        // Base span is 2s; 5s out must go to the overflow wheel
        let task = TimerTask::new(15_000, noop_action());
        assert!(wheel.add(&task));
        assert!(wheel.has_overflow());
        assert_eq!(wheel.pending(), 1);
    }

    #[test]
    fn test_advance_moves_tick_aligned() {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(100, 20, 10_000, queue);
        wheel.advance(10_050);
        assert_eq!(wheel.current_time(), 10_000);
        wheel.advance(10_230);
        assert_eq!(wheel.current_time(), 10_200);
    }

    #[test]
    fn test_cascade_reinsert_into_base() {
        let queue = DelayQueue::new();
        let wheel = TimingWheel::new(100, 20, 10_000, queue.clone());
        let task = TimerTask::new(12_500, noop_action());
        assert!(wheel.add(&task));
        assert!(wheel.has_overflow());

        // The overflow bucket covers [12_000, 14_000); once the clock reaches
        // it, the task re-inserts into the base wheel at its exact window.
        let bucket = queue.try_poll(12_000).expect("overflow bucket expired");
        wheel.advance(bucket.expiration());
        for entry in bucket.drain() {
            assert!(wheel.add(&entry), "task should fit the base wheel now");
        }
        let base_bucket = queue.try_poll(12_500).expect("base bucket expired");
        assert_eq!(base_bucket.expiration(), 12_500);
        assert_eq!(base_bucket.drain().len(), 1);
    }
}
