//! Logger handed to the worker
//!
//! Prefixes every line with the destination name and applies the
//! success/failure verbosity switches from the destination config.

#[cfg(test)]
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct DeliveryLog {
    name: String,
    log_success: bool,
    log_failure: bool,
    /// Failure lines as written, shared between clones
    #[cfg(test)]
    failures: Arc<Mutex<Vec<String>>>,
}

impl DeliveryLog {
    pub fn new(name: impl Into<String>, log_success: bool, log_failure: bool) -> Self {
        Self {
            name: name.into(),
            log_success,
            log_failure,
            #[cfg(test)]
            failures: Arc::default(),
        }
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }

    pub fn trace(&self, msg: &str) {
        log::trace!("{}: {}", self.name, msg);
    }

    pub fn debug(&self, msg: &str) {
        log::debug!("{}: {}", self.name, msg);
    }

    pub fn info(&self, msg: &str) {
        log::info!("{}: {}", self.name, msg);
    }

    pub fn error(&self, msg: &str) {
        log::error!("{}: {}", self.name, msg);
    }

    pub fn success(&self, msg: &str) {
        if self.log_success {
            self.info(msg);
        }
    }

    /// A record was given up on
    pub fn failure(&self, msg: &str) {
        if self.log_failure {
            self.error(msg);
            #[cfg(test)]
            self.failures.lock().unwrap().push(format!("{}: {}", self.name, msg));
        }
    }
}
