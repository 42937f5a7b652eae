//! Request construction
//!
//! Turns a record into the exact HTTP request the destination expects. Two
//! protocol variants exist; which one is used is fixed when the builder is
//! created from the destination config.

use serde::{Deserialize, Serialize};

use crate::config::DestinationConfig;
use crate::delivery::DeliveryError;
use crate::record::Record;

pub mod json;
pub mod query;

/// Destination protocol variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// US units in the query string
    #[default]
    Get,
    /// Metric units in a JSON body
    Post,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Get => write!(f, "get"),
            Protocol::Post => write!(f, "post"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// A fully built request, ready for the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRequest {
    pub method: Method,
    #[serde(skip_serializing)]
    pub url: String,
    /// Same as `url` with the API key masked; the only form that gets logged
    pub redacted_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'static str>,
    pub user_agent: String,
}

/// Builds requests for one destination
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    protocol: Protocol,
    server_url: String,
    api_key: String,
    station: i64,
    user_agent: String,
}

impl RequestBuilder {
    pub fn new(
        protocol: Protocol,
        server_url: impl Into<String>,
        api_key: impl Into<String>,
        station: i64,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            station,
            user_agent: user_agent.into(),
        }
    }

    /// Builder for a validated destination config
    pub fn from_config(config: &DestinationConfig) -> Result<Self, DeliveryError> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(
            config.protocol,
            config.server_url.as_str(),
            api_key,
            config.station,
            config.user_agent.as_str(),
        ))
    }

    pub fn build(&self, record: &Record) -> Result<DeliveryRequest, DeliveryError> {
        let (method, suffix, body, content_type) = match self.protocol {
            Protocol::Get => {
                let query = query::encode(&query::fields(record, self.station));
                let suffix = if query.is_empty() { String::new() } else { format!("?{}", query) };
                (Method::Get, suffix, None, None)
            }
            Protocol::Post => {
                let body = json::body(record, self.station)?;
                (Method::Post, String::new(), Some(body), Some("application/json"))
            }
        };

        Ok(DeliveryRequest {
            method,
            url: format!("{}/{}{}", self.server_url, self.api_key, suffix),
            redacted_url: format!("{}/XXX{}", self.server_url, suffix),
            body,
            content_type,
            user_agent: self.user_agent.clone(),
        })
    }
}
