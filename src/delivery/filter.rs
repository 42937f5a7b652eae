//! Staleness and backlog checks applied to each dequeued record

use super::{DeliveryError, RecordQueue};

/// What backlog trimming took away around the record in hand
#[derive(Debug, PartialEq)]
pub struct Trimmed<T> {
    /// The record in hand was among the oldest over the limit
    pub current: bool,
    /// Queued records dropped, oldest first
    pub queued: Vec<T>,
}

impl<T> Trimmed<T> {
    pub fn count(&self) -> usize {
        self.queued.len() + usize::from(self.current)
    }
}

/// Drop records oldest first while more than `max_backlog` wait behind the
/// record in hand.
///
/// The record in hand was dequeued first, so it is the oldest of them all and
/// goes before anything still queued. The newest `max_backlog + 1` records
/// survive.
pub fn trim_backlog<T>(queue: &RecordQueue<T>, max_backlog: Option<usize>) -> Trimmed<T> {
    match max_backlog {
        Some(max) if queue.len() > max => Trimmed {
            current: true,
            queued: queue.trim_to(max + 1),
        },
        _ => Trimmed {
            current: false,
            queued: Vec::new(),
        },
    }
}

/// Reject a record older than `stale` seconds at time `now`
pub fn check_staleness(timestamp: i64, now: f64, stale: Option<u64>) -> Result<(), DeliveryError> {
    let Some(limit) = stale else {
        return Ok(());
    };

    let age = (now - timestamp as f64).floor() as i64;
    if age > i64::try_from(limit).unwrap_or(i64::MAX) {
        return Err(DeliveryError::Stale { age, limit });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limit_never_stale() {
        assert!(check_staleness(0, 1_700_000_000.0, None).is_ok());
    }

    #[test]
    fn test_age_at_limit_is_fresh() {
        assert!(check_staleness(1000, 1060.0, Some(60)).is_ok());
        assert!(check_staleness(1000, 1060.9, Some(60)).is_ok());
    }

    #[test]
    fn test_age_past_limit_is_stale() {
        match check_staleness(1000, 1061.0, Some(60)) {
            Err(DeliveryError::Stale { age, limit }) => {
                assert_eq!(age, 61);
                assert_eq!(limit, 60);
            }
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        assert!(check_staleness(2000, 1000.0, Some(0)).is_ok());
    }

    #[test]
    fn test_huge_limit_never_stale() {
        assert!(check_staleness(0, 1_700_000_000.0, Some(u64::MAX)).is_ok());
        assert!(check_staleness(i64::MIN, 1_700_000_000.0, Some(i64::MAX as u64 + 1)).is_ok());
    }

    #[test]
    fn test_backlog_drops_record_in_hand_first() {
        // Record 0 is in hand, 1..10 are queued
        let queue = RecordQueue::new();
        for i in 1..10 {
            queue.enqueue(i);
        }

        let trimmed = trim_backlog(&queue, Some(3));

        assert!(trimmed.current);
        assert_eq!(trimmed.queued, vec![1, 2, 3, 4, 5]);
        assert_eq!(trimmed.count(), 6);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_backlog_at_limit_keeps_record_in_hand() {
        let queue = RecordQueue::new();
        for i in 1..4 {
            queue.enqueue(i);
        }

        let trimmed = trim_backlog(&queue, Some(3));

        assert_eq!(trimmed.count(), 0);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_zero_backlog_keeps_only_newest() {
        let queue = RecordQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);

        let trimmed = trim_backlog(&queue, Some(0));

        assert!(trimmed.current);
        assert_eq!(trimmed.queued, vec![1]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_unbounded_backlog_untouched() {
        let queue = RecordQueue::new();
        for i in 0..10 {
            queue.enqueue(i);
        }
        assert_eq!(trim_backlog(&queue, None).count(), 0);
        assert_eq!(queue.len(), 10);
    }
}
