//! Expiration-ordered queue of armed buckets
//!
//! Only buckets that actually hold tasks are ever offered here, so the timer
//! driver processes content-bearing buckets and never scans empty slots.

use std::cmp::Ordering as CmpOrdering;
use std::collections::binary_heap::PeekMut;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::bucket::TimerTaskList;
use super::clock::wall_clock_ms;

struct QueueEntry {
    expiration: i64,
    bucket: Arc<TimerTaskList>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.expiration == other.expiration
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed so the binary heap pops the earliest expiration first
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.expiration.cmp(&self.expiration)
    }
}

/// Min-heap of armed buckets with an async bounded-timeout poll
pub(crate) struct DelayQueue {
    heap: Mutex<BinaryHeap<QueueEntry>>,
    notify: Notify,
}

impl DelayQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
        })
    }

    /// Register a bucket under its (newly set) expiration
    pub(crate) fn offer(&self, bucket: Arc<TimerTaskList>, expiration_ms: i64) {
        self.heap.lock().push(QueueEntry {
            expiration: expiration_ms,
            bucket,
        });
        self.notify.notify_one();
    }

    /// Pop the next expired bucket, waiting at most `timeout`
    ///
    /// Wakes early when an `offer` lands an earlier expiration. Returns
    /// `None` when the timeout elapses with nothing expired; the caller is
    /// expected to loop.
    pub(crate) async fn poll(&self, timeout: Duration) -> Option<Arc<TimerTaskList>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let now_ms = wall_clock_ms();
            let head_wait_ms = {
                let mut heap = self.heap.lock();
                let r = match heap.peek_mut() {
                    Some(head) if head.expiration <= now_ms => {
                        return Some(PeekMut::pop(head).bucket);
                    }
                    Some(head) => Some(head.expiration - now_ms),
                    None => None,
                };
                r
            };

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return None;
            }
            let sleep_to = match head_wait_ms {
                Some(ms) => (now + Duration::from_millis(ms as u64)).min(deadline),
                None => deadline,
            };

            tokio::select! {
                _ = tokio::time::sleep_until(sleep_to) => {}
                _ = self.notify.notified() => {}
            }
        }
    }

    /// Non-blocking variant used to drain everything already expired
    pub(crate) fn try_poll(&self, now_ms: i64) -> Option<Arc<TimerTaskList>> {
        let mut heap = self.heap.lock();
        let r = match heap.peek_mut() {
            Some(head) if head.expiration <= now_ms => Some(PeekMut::pop(head).bucket),
            _ => None,
        };
        r
    }

    /// Wake any in-flight poll (used on shutdown)
    pub(crate) fn wake(&self) {
        self.notify.notify_waiters();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.lock().len()
    }
}
