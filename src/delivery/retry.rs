//! Bounded retry with a fixed wait between attempts

use std::time::Duration;

use super::{Clock, DeliveryError, DeliveryLog, DeliveryTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
    retry_wait: Duration,
}

impl RetryPolicy {
    /// `max_tries` below one is treated as one
    pub fn new(max_tries: u32, retry_wait: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            retry_wait,
        }
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    pub fn retry_wait(&self) -> Duration {
        self.retry_wait
    }

    /// Run `attempt` against the task's record until it succeeds, fails fatally
    /// or the attempts run out. The task's bookkeeping is updated as it goes.
    pub fn run<R, F>(
        &self,
        task: &mut DeliveryTask<R>,
        clock: &dyn Clock,
        log: &DeliveryLog,
        mut attempt: F,
    ) -> Result<(), DeliveryError>
    where
        F: FnMut(&R) -> Result<(), DeliveryError>,
    {
        while task.attempts < self.max_tries {
            task.attempts += 1;

            match attempt(&task.record) {
                Ok(()) => {
                    task.last_error = None;
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    log.debug(&format!("attempt {} of {} failed: {}", task.attempts, self.max_tries, e));
                    task.last_error = Some(e);
                    if task.attempts < self.max_tries {
                        clock.sleep(self.retry_wait);
                    }
                }
                Err(e) => {
                    log.debug(&format!("attempt {} failed fatally: {}", task.attempts, e));
                    return Err(e);
                }
            }
        }

        let last = task
            .last_error
            .take()
            .unwrap_or_else(|| DeliveryError::Transient("no attempt was made".to_string()));

        Err(DeliveryError::Exhausted {
            attempts: task.attempts,
            last: Box::new(last),
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::clock::testing::ManualClock;

    fn log() -> DeliveryLog {
        DeliveryLog::new("test", true, true)
    }

    #[test]
    fn test_success_on_first_attempt() {
        let clock = ManualClock::at(0.0);
        let mut task = DeliveryTask::new("record");

        let result = RetryPolicy::default().run(&mut task, &clock, &log(), |_| Ok(()));

        assert!(result.is_ok());
        assert_eq!(task.attempts, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_transient_failures_exhaust_attempts() {
        let clock = ManualClock::at(0.0);
        let mut task = DeliveryTask::new("record");
        let mut calls = 0;

        let result = RetryPolicy::new(3, Duration::from_secs(5)).run(&mut task, &clock, &log(), |_| {
            calls += 1;
            Err(DeliveryError::Transient("HTTP 503".to_string()))
        });

        assert_eq!(calls, 3);
        assert!(matches!(result, Err(DeliveryError::Exhausted { attempts: 3, .. })));
        // Waits only between attempts, not after the last one
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5), Duration::from_secs(5)]);
    }

    #[test]
    fn test_rejection_short_circuits() {
        let clock = ManualClock::at(0.0);
        let mut task = DeliveryTask::new("record");
        let mut calls = 0;

        let result = RetryPolicy::new(5, Duration::from_secs(5)).run(&mut task, &clock, &log(), |_| {
            calls += 1;
            Err(DeliveryError::Rejected {
                status: 400,
                reason: "bad request".to_string(),
            })
        });

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(DeliveryError::Rejected { status: 400, .. })));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let clock = ManualClock::at(0.0);
        let mut task = DeliveryTask::new("record");
        let mut calls = 0;

        let result = RetryPolicy::new(3, Duration::from_secs(2)).run(&mut task, &clock, &log(), |_| {
            calls += 1;
            if calls < 2 {
                Err(DeliveryError::Transient("connection reset".to_string()))
            } else {
                Ok(())
            }
        });

        assert!(result.is_ok());
        assert_eq!(task.attempts, 2);
        assert!(task.last_error.is_none());
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn test_zero_tries_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_tries(), 1);
    }
}
