use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::warn;

/// Bounded queue that drops the oldest entry on overflow instead of
/// blocking the producer, per the tee's backpressure policy. Every drop
/// increments a counter surfaced through [`DropOldestQueue::dropped`].
pub struct DropOldestQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
    label: &'static str,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize, label: &'static str) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            label,
        }
    }

    pub fn push(&self, item: T) {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(queue = self.label, total_dropped = total, "queue full, dropped oldest entry");
        }
        guard.push_back(item);
        drop(guard);
        self.notify.notify_one();
    }

    /// Mark no more items will be pushed; wakes any pending `pop`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Await the next item, or `None` once closed and drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            {
                let mut guard = self.inner.lock().expect("queue mutex poisoned");
                if let Some(item) = guard.pop_front() {
                    return Some(item);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
