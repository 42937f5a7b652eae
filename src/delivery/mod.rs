//! Bounded, retrying delivery of records to a remote HTTP sink
//!
//! A producer pushes records into a [`RecordQueue`]; a single [`Worker`]
//! drains it, drops stale and overflowing records, turns each survivor into a
//! request and hands it to a [`Transport`] under a [`RetryPolicy`].

use thiserror::Error;

pub mod clock;
pub mod filter;
pub mod logger;
pub mod queue;
pub mod retry;
pub mod transport;
pub mod worker;

pub use clock::{Clock, SystemClock};
pub use logger::DeliveryLog;
pub use queue::{QueueItem, RecordQueue};
pub use retry::RetryPolicy;
pub use transport::{Transport, UreqTransport};
pub use worker::{DeliverySettings, Worker, WorkerState, WorkerSummary};

/// Anything the worker can age-check
pub trait Timestamped {
    /// Unix epoch seconds
    fn timestamp(&self) -> i64;
}

/// Everything that can go wrong between enqueue and delivery
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("rejected by server (HTTP {status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("record is stale: {age}s old, limit {limit}s")]
    Stale { age: i64, limit: u64 },

    #[error("backlog overflow: dropped {dropped} oldest records")]
    BacklogOverflow { dropped: usize },

    #[error("could not build request: {0}")]
    Build(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<DeliveryError> },

    #[error("delivery worker panicked")]
    WorkerPanicked,
}

impl DeliveryError {
    /// Whether another attempt at the same record could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

/// One record plus its retry bookkeeping
#[derive(Debug)]
pub struct DeliveryTask<R> {
    pub record: R,
    pub attempts: u32,
    pub last_error: Option<DeliveryError>,
}

impl<R> DeliveryTask<R> {
    pub fn new(record: R) -> Self {
        Self {
            record,
            attempts: 0,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(DeliveryError::Transient("timeout".to_string()).is_retryable());
        assert!(
            !DeliveryError::Rejected {
                status: 401,
                reason: "bad key".to_string()
            }
            .is_retryable()
        );
        assert!(!DeliveryError::Stale { age: 10, limit: 5 }.is_retryable());
        assert!(!DeliveryError::Configuration("missing api_key".to_string()).is_retryable());
    }

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let err = DeliveryError::Exhausted {
            attempts: 3,
            last: Box::new(DeliveryError::Transient("HTTP 503".to_string())),
        };
        assert_eq!(err.to_string(), "gave up after 3 attempts: transient failure: HTTP 503");
    }
}
