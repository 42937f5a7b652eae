//! The delivery worker
//!
//! One worker per destination drains the queue strictly in order, so there
//! is never more than one request in flight.

use chrono::DateTime;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::filter;
use super::{Clock, DeliveryError, DeliveryLog, DeliveryTask, QueueItem, RecordQueue, RetryPolicy, Timestamped, Transport};
use crate::request::DeliveryRequest;

/// Timing and policy knobs the worker runs with
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Minimum time between successful posts
    pub post_interval: Option<Duration>,
    /// Queue depth above which the oldest records are dropped
    pub max_backlog: Option<usize>,
    /// Records older than this many seconds are discarded
    pub stale: Option<u64>,
    /// Dry run: go through the motions without network I/O
    pub skip_upload: bool,
    pub retry: RetryPolicy,
    /// How long to wait on an empty queue before checking for a stop request
    pub poll_interval: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            post_interval: None,
            max_backlog: None,
            stale: None,
            skip_upload: false,
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Throttled,
    Filtering,
    Building,
    Sending,
    Stopped,
}

/// What happened to every record the worker saw
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub delivered: usize,
    pub skipped: usize,
    pub stale: usize,
    pub backlog_dropped: usize,
    pub rejected: usize,
    pub abandoned: usize,
    pub unbuildable: usize,
}

impl WorkerSummary {
    /// Records that reached a terminal state
    pub fn total(&self) -> usize {
        self.delivered + self.skipped + self.stale + self.backlog_dropped + self.rejected + self.abandoned + self.unbuildable
    }
}

fn describe(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Drains a [`RecordQueue`] into a [`Transport`].
///
/// `B` maps a record to its request; it is the only destination-specific piece.
pub struct Worker<R, B, T> {
    queue: RecordQueue<R>,
    settings: DeliverySettings,
    build: B,
    transport: T,
    clock: Arc<dyn Clock>,
    log: DeliveryLog,
    stop: Arc<AtomicBool>,
    state: WorkerState,
    last_post: Option<f64>,
    summary: WorkerSummary,
}

impl<R, B, T> Worker<R, B, T>
where
    R: Timestamped,
    B: Fn(&R) -> Result<DeliveryRequest, DeliveryError>,
    T: Transport,
{
    pub fn new(
        queue: RecordQueue<R>,
        settings: DeliverySettings,
        build: B,
        transport: T,
        clock: Arc<dyn Clock>,
        log: DeliveryLog,
    ) -> Self {
        Self {
            queue,
            settings,
            build,
            transport,
            clock,
            log,
            stop: Arc::new(AtomicBool::new(false)),
            state: WorkerState::Idle,
            last_post: None,
            summary: WorkerSummary::default(),
        }
    }

    /// Flag that makes the worker stop after its current cycle
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[cfg(test)]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            self.log.trace(&format!("{:?} -> {:?}", self.state, next));
            self.state = next;
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Process records until end-of-stream or a stop request
    pub fn run(mut self) -> WorkerSummary {
        self.log.debug(&format!(
            "worker started (max_tries {}, retry_wait {:?})",
            self.settings.retry.max_tries(),
            self.settings.retry.retry_wait()
        ));

        loop {
            self.transition(WorkerState::Idle);

            match self.queue.dequeue(self.settings.poll_interval) {
                Some(QueueItem::Record(record)) => self.process(record),
                Some(QueueItem::EndOfStream) => {
                    self.log.debug("end of stream");
                    break;
                }
                None => {}
            }

            if self.stop_requested() {
                self.log.debug("stop requested");
                break;
            }
        }

        self.transition(WorkerState::Stopped);
        self.log.debug(&format!("worker stopped: {:?}", self.summary));
        self.summary
    }

    /// One full cycle for a dequeued record
    fn process(&mut self, record: R) {
        self.throttle();

        self.transition(WorkerState::Filtering);
        if !self.passes_filters(&record) {
            return;
        }

        if self.settings.skip_upload {
            self.log.debug(&format!("skipped upload of record {}", describe(record.timestamp())));
            self.summary.skipped += 1;
            self.last_post = Some(self.clock.now());
            return;
        }

        self.transition(WorkerState::Building);
        let request = match (self.build)(&record) {
            Ok(request) => request,
            Err(e) => {
                self.summary.unbuildable += 1;
                self.log.failure(&format!("dropping record {}: {}", describe(record.timestamp()), e));
                return;
            }
        };
        self.log.debug(&format!("url: {}", request.redacted_url));

        self.transition(WorkerState::Sending);
        let timestamp = record.timestamp();
        let mut task = DeliveryTask::new(record);
        let transport = &self.transport;
        let result = self
            .settings
            .retry
            .run(&mut task, self.clock.as_ref(), &self.log, |_| transport.send(&request));

        match result {
            Ok(()) => {
                self.summary.delivered += 1;
                self.last_post = Some(self.clock.now());
                self.log.success(&format!("published record {}", describe(timestamp)));
            }
            Err(e @ DeliveryError::Rejected { .. }) => {
                self.summary.rejected += 1;
                self.log.failure(&format!("record {} rejected: {}", describe(timestamp), e));
            }
            Err(e) => {
                self.summary.abandoned += 1;
                self.log.failure(&format!("failed to publish record {}: {}", describe(timestamp), e));
            }
        }
    }

    /// Wait out whatever is left of the post interval
    fn throttle(&mut self) {
        let (Some(interval), Some(last)) = (self.settings.post_interval, self.last_post) else {
            return;
        };

        let remaining = interval.as_secs_f64() - (self.clock.now() - last);
        if remaining > 0.0 {
            self.transition(WorkerState::Throttled);
            self.log.debug(&format!("waiting {:.1}s for post interval", remaining));
            let wait = Duration::try_from_secs_f64(remaining).map_or(interval, |d| d.min(interval));
            self.clock.sleep(wait);
        }
    }

    /// Backlog trimming, then the staleness check for this record
    fn passes_filters(&mut self, record: &R) -> bool {
        let trimmed = filter::trim_backlog(&self.queue, self.settings.max_backlog);
        if trimmed.current {
            let overflow = DeliveryError::BacklogOverflow { dropped: trimmed.count() };
            self.log.debug(&overflow.to_string());
            let oldest = std::iter::once(record.timestamp()).chain(trimmed.queued.iter().map(Timestamped::timestamp));
            for timestamp in oldest {
                self.log.debug(&format!("dropped backlogged record {}", describe(timestamp)));
            }
            self.summary.backlog_dropped += trimmed.count();
            return false;
        }

        if let Err(e) = filter::check_staleness(record.timestamp(), self.clock.now(), self.settings.stale) {
            self.log.debug(&format!("skipping record {}: {}", describe(record.timestamp()), e));
            self.summary.stale += 1;
            return false;
        }

        true
    }
}
