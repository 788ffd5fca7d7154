//! A bounded-concurrency FIFO work queue with Python `queue.Queue`-style
//! `join()` semantics: producers and consumers can both add work, and any
//! caller can block until every enqueued item has been marked done.
//!
//! Deliberately simple: one mutex, one condition variable guarding "an item
//! is available or the queue is closed", and an outstanding-task counter
//! guarding a second condition variable for `join`. No work-stealing, no
//! per-worker deques — directories are cheap enough to push/pop that a
//! single shared queue is not a bottleneck for this workload.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    outstanding: Mutex<usize>,
    all_done: Condvar,
}

impl<T> WorkQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            outstanding: Mutex::new(0),
            all_done: Condvar::new(),
        }
    }

    /// Push an item and record one more outstanding task.
    pub fn put(&self, item: T) {
        {
            let mut outstanding = self.outstanding.lock().unwrap();
            *outstanding += 1;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Block until an item is available, or return `None` once the queue is
    /// closed and drained.
    pub fn get(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Mark one previously-`put` task complete. When the outstanding count
    /// reaches zero, wakes every `join` waiter.
    pub fn task_done(&self) {
        let mut outstanding = self.outstanding.lock().unwrap();
        debug_assert!(*outstanding > 0, "task_done called more times than put");
        *outstanding = outstanding.saturating_sub(1);
        let now_zero = *outstanding == 0;
        drop(outstanding);
        if now_zero {
            self.all_done.notify_all();
        }
    }

    /// Block until every `put` task has had a matching `task_done`.
    pub fn join(&self) {
        let mut outstanding = self.outstanding.lock().unwrap();
        while *outstanding != 0 {
            outstanding = self.all_done.wait(outstanding).unwrap();
        }
    }

    /// Close the queue: every blocked and future `get` returns `None` once
    /// the queue is drained. Used to release worker threads at shutdown.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn put_get_roundtrip() {
        let queue: WorkQueue<i32> = WorkQueue::new();
        queue.put(1);
        queue.put(2);
        assert_eq!(queue.get(), Some(1));
        assert_eq!(queue.get(), Some(2));
    }

    #[test]
    fn join_waits_for_task_done() {
        let queue = Arc::new(WorkQueue::<i32>::new());
        queue.put(42);

        let worker_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let item = worker_queue.get().unwrap();
            assert_eq!(item, 42);
            thread::sleep(std::time::Duration::from_millis(20));
            worker_queue.task_done();
        });

        queue.join();
        handle.join().unwrap();
    }

    #[test]
    fn close_unblocks_waiting_workers() {
        let queue = Arc::new(WorkQueue::<i32>::new());
        let worker_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || worker_queue.get());
        thread::sleep(std::time::Duration::from_millis(20));
        queue.close();
        assert_eq!(handle.join().unwrap(), None);
    }
}
