//! Shared FIFO between the producer and the delivery worker

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// An entry in the queue
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem<T> {
    Record(T),
    /// No more records will follow
    EndOfStream,
}

struct Inner<T> {
    items: Mutex<VecDeque<QueueItem<T>>>,
    available: Condvar,
}

/// Unbounded FIFO; producers never block, the consumer waits with a timeout.
///
/// Cloning yields another handle to the same queue.
pub struct RecordQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RecordQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for RecordQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
            }),
        }
    }

    // A panic while holding the lock cannot leave the deque half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueItem<T>>> {
        self.inner.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, item: QueueItem<T>) {
        self.lock().push_back(item);
        self.inner.available.notify_one();
    }

    /// Append a record to the tail
    pub fn enqueue(&self, record: T) {
        self.push(QueueItem::Record(record));
    }

    /// Append the end-of-stream marker
    pub fn close(&self) {
        self.push(QueueItem::EndOfStream);
    }

    /// Take the head, waiting up to `timeout` for one to arrive
    pub fn dequeue(&self, timeout: Duration) -> Option<QueueItem<T>> {
        let deadline = Instant::now() + timeout;
        let mut items = self.lock();

        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }

            items = match self.inner.available.wait_timeout(items, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Number of queued records, not counting the end-of-stream marker
    pub fn len(&self) -> usize {
        self.lock()
            .iter()
            .filter(|item| matches!(item, QueueItem::Record(_)))
            .count()
    }

    /// Drop records from the head until at most `max` remain; returns them oldest first
    pub fn trim_to(&self, max: usize) -> Vec<T> {
        let mut items = self.lock();
        let queued = items.iter().filter(|item| matches!(item, QueueItem::Record(_))).count();
        let mut excess = queued.saturating_sub(max);
        let mut dropped = Vec::with_capacity(excess);

        while excess > 0 {
            match items.pop_front() {
                Some(QueueItem::Record(record)) => {
                    dropped.push(record);
                    excess -= 1;
                }
                Some(QueueItem::EndOfStream) => {
                    // Only reachable if records were enqueued after close; keep the marker
                    items.push_front(QueueItem::EndOfStream);
                    break;
                }
                None => break,
            }
        }

        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = RecordQueue::new();
        for i in 0..5 {
            queue.enqueue(i);
        }

        let drained: Vec<_> = (0..5).map(|_| queue.dequeue(Duration::ZERO)).collect();
        assert_eq!(
            drained,
            (0..5).map(|i| Some(QueueItem::Record(i))).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_dequeue_times_out_when_empty() {
        let queue: RecordQueue<u32> = RecordQueue::new();
        let start = Instant::now();
        assert_eq!(queue.dequeue(Duration::from_millis(50)), None);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_dequeue_wakes_on_enqueue_from_other_thread() {
        let queue = RecordQueue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.enqueue("late");
        });

        assert_eq!(queue.dequeue(Duration::from_secs(5)), Some(QueueItem::Record("late")));
        handle.join().unwrap();
    }

    #[test]
    fn test_close_appends_marker_after_records() {
        let queue = RecordQueue::new();
        queue.enqueue(1);
        queue.close();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue(Duration::ZERO), Some(QueueItem::Record(1)));
        assert_eq!(queue.dequeue(Duration::ZERO), Some(QueueItem::EndOfStream));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_trim_drops_oldest_and_keeps_marker() {
        let queue = RecordQueue::new();
        for i in 0..6 {
            queue.enqueue(i);
        }
        queue.close();

        let dropped = queue.trim_to(2);

        assert_eq!(dropped, vec![0, 1, 2, 3]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue(Duration::ZERO), Some(QueueItem::Record(4)));
        assert_eq!(queue.dequeue(Duration::ZERO), Some(QueueItem::Record(5)));
        assert_eq!(queue.dequeue(Duration::ZERO), Some(QueueItem::EndOfStream));
    }

    #[test]
    fn test_trim_noop_under_limit() {
        let queue = RecordQueue::new();
        queue.enqueue(1);
        assert!(queue.trim_to(10).is_empty());
        assert_eq!(queue.len(), 1);
    }
}
