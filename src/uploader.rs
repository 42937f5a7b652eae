//! Uploader service
//!
//! Owns the queue and the background worker for one destination. Producers
//! only ever see [`Uploader::submit`], which never blocks and never fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::config::DestinationConfig;
use crate::delivery::{Clock, DeliveryError, DeliveryLog, RecordQueue, SystemClock, Transport, UreqTransport, Worker, WorkerSummary};
use crate::record::Record;
use crate::request::RequestBuilder;

/// Name used as the prefix of every delivery log line
pub const PROTOCOL_NAME: &str = "Windy";

/// Cloneable producer handle onto an uploader's queue
#[derive(Clone)]
pub struct RecordSender {
    queue: RecordQueue<Record>,
}

impl RecordSender {
    pub fn submit(&self, record: Record) {
        self.queue.enqueue(record);
    }
}

/// Stops the worker from another thread
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct Uploader {
    queue: RecordQueue<Record>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<WorkerSummary>>,
}

impl Uploader {
    /// Validate the config and start the worker thread
    pub fn start(config: &DestinationConfig) -> Result<Self, DeliveryError> {
        Self::start_with(config, UreqTransport::new(config.timeout()), Arc::new(SystemClock))
    }

    /// Same as [`Uploader::start`] with an explicit transport and clock
    pub fn start_with<T>(config: &DestinationConfig, transport: T, clock: Arc<dyn Clock>) -> Result<Self, DeliveryError>
    where
        T: Transport + 'static,
    {
        let log = DeliveryLog::new(PROTOCOL_NAME, config.log_success, config.log_failure);
        log.info(&format!("version is {}", env!("CARGO_PKG_VERSION")));

        if let Err(e) = config.validate() {
            log.info(&format!("Data will not be posted: {}", e));
            return Err(e);
        }

        let builder = RequestBuilder::from_config(config)?;
        let queue = RecordQueue::new();
        let worker = Worker::new(
            queue.clone(),
            config.delivery_settings(),
            move |record: &Record| builder.build(record),
            transport,
            clock,
            log.clone(),
        );
        let stop = worker.stop_handle();

        let handle = thread::Builder::new()
            .name(format!("{}-worker", PROTOCOL_NAME.to_lowercase()))
            .spawn(move || worker.run())
            .map_err(|e| DeliveryError::Configuration(format!("failed to spawn worker thread: {}", e)))?;

        if config.skip_upload {
            log.info("Upload disabled: records will be processed but not sent");
        } else {
            log.info(&format!("Data will be uploaded to {}", config.server_url));
        }

        Ok(Self {
            queue,
            stop,
            handle: Some(handle),
        })
    }

    /// Hand a record to the worker
    pub fn submit(&self, record: Record) {
        self.queue.enqueue(record);
    }

    /// Handle for submitting from another thread
    pub fn sender(&self) -> RecordSender {
        RecordSender {
            queue: self.queue.clone(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Records waiting for the worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Ask the worker to stop after its current cycle, abandoning queued records
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Signal end-of-stream and wait for the worker to drain the queue
    pub fn finish(mut self) -> Result<WorkerSummary, DeliveryError> {
        self.queue.close();
        self.join()
    }

    fn join(&mut self) -> Result<WorkerSummary, DeliveryError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| DeliveryError::WorkerPanicked),
            None => Ok(WorkerSummary::default()),
        }
    }
}

impl Drop for Uploader {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            let _ = self.join();
        }
    }
}
