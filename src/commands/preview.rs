//! Show the requests records would turn into
//!
//! Nothing is sent. The API key is always masked in the output.

use colored::*;
use eyre::{Context, Result};
use std::io::BufRead;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::config::{API_KEY_PLACEHOLDER, Config};
use crate::record::Record;
use crate::request::{DeliveryRequest, Protocol, RequestBuilder};

pub fn run(input: Option<&Path>, protocol: Option<Protocol>, format: OutputFormat, config: &Config) -> Result<()> {
    let destination = &config.destination;
    let builder = RequestBuilder::new(
        protocol.unwrap_or(destination.protocol),
        destination.server_url.as_str(),
        destination.require_api_key().unwrap_or(API_KEY_PLACEHOLDER),
        destination.station,
        destination.user_agent.as_str(),
    );

    let mut requests = Vec::new();
    for (index, line) in super::open_input(input)?.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let record = Record::from_json(&line).with_context(|| format!("Invalid record on line {}", index + 1))?;
        let request = builder
            .build(&record)
            .with_context(|| format!("Cannot build request for line {}", index + 1))?;
        requests.push(request);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&requests)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&requests)?),
        OutputFormat::Text => {
            for request in &requests {
                print_request(request);
            }
        }
    }

    Ok(())
}

fn print_request(request: &DeliveryRequest) {
    let method = format!("{:?}", request.method).to_uppercase();
    println!("{} {}", method.cyan(), request.redacted_url);
    if let Some(body) = &request.body {
        println!("  {}", body.dimmed());
    }
}
