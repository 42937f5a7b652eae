//! Time source for the worker
//!
//! Staleness, throttling and retry waits all read and spend time through
//! this trait so tests can run them without sleeping.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> f64;

    /// Block the calling thread
    fn sleep(&self, duration: Duration);
}

/// Wall clock and real sleeps
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when slept on, recording every sleep
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<f64>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn at(now: f64) -> Self {
            Self {
                now: Mutex::new(now),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        pub fn advance(&self, secs: f64) {
            *self.now.lock().unwrap() += secs;
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> f64 {
            *self.now.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            self.advance(duration.as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800.0);
    }

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::at(100.0);
        clock.sleep(Duration::from_secs(5));
        assert_eq!(clock.now(), 105.0);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }
}
