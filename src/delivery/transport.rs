//! Network side of delivery

use std::time::Duration;

use super::DeliveryError;
use crate::request::{DeliveryRequest, Method};

/// Performs one HTTP exchange for a built request
pub trait Transport: Send {
    fn send(&self, request: &DeliveryRequest) -> Result<(), DeliveryError>;
}

/// Blocking HTTP transport backed by a ureq agent
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole exchange, connect through body
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self { agent: config.into() }
    }

    /// Ignores proxy settings from the environment
    #[cfg(test)]
    fn direct(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .proxy(None)
            .build();

        Self { agent: config.into() }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &DeliveryRequest) -> Result<(), DeliveryError> {
        let result = match request.method {
            Method::Get => self
                .agent
                .get(request.url.as_str())
                .header("User-Agent", request.user_agent.as_str())
                .call(),
            Method::Post => {
                let mut builder = self
                    .agent
                    .post(request.url.as_str())
                    .header("User-Agent", request.user_agent.as_str());
                if let Some(content_type) = request.content_type {
                    builder = builder.header("Content-Type", content_type);
                }
                builder.send(request.body.as_deref().unwrap_or("").as_bytes())
            }
        };

        let mut response = result.map_err(classify_error)?;
        let status = response.status().as_u16();
        if is_success(status) {
            return Ok(());
        }

        let body = response.body_mut().read_to_string().unwrap_or_default();
        Err(status_error(status, &body))
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Map a non-2xx status to the error class that decides retrying
pub fn status_error(status: u16, body: &str) -> DeliveryError {
    let reason: String = body.trim().chars().take(200).collect();

    if (400..500).contains(&status) {
        DeliveryError::Rejected { status, reason }
    } else if reason.is_empty() {
        DeliveryError::Transient(format!("HTTP {}", status))
    } else {
        DeliveryError::Transient(format!("HTTP {}: {}", status, reason))
    }
}

fn classify_error(err: ureq::Error) -> DeliveryError {
    match err {
        ureq::Error::StatusCode(status) => status_error(status, ""),
        ureq::Error::Timeout(_) => DeliveryError::Transient(format!("timed out: {}", err)),
        other => DeliveryError::Transient(other.to_string()),
    }
}
