use colored::*;
use eyre::{Result, eyre};

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

/// Copy of the config safe to print
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.destination.api_key.is_some() {
        config.destination.api_key = Some("XXX".to_string());
    }
    config
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    let config = redacted(config);
    let dest = &config.destination;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&config)?);
        }
        OutputFormat::Text => {
            println!("{}", "wxrelay Configuration".bold());
            println!();

            println!("  log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "destination".cyan());
            println!("  api_key: {}", optional(dest.api_key.as_deref()));
            println!("  station: {}", dest.station);
            println!("  server_url: {}", dest.server_url);
            println!("  protocol: {}", dest.protocol);
            println!("  skip_upload: {}", dest.skip_upload);
            println!("  post_interval: {}", optional(dest.post_interval));
            println!("  max_backlog: {}", optional(dest.max_backlog));
            println!("  stale: {}", optional(dest.stale));
            println!("  timeout: {}", dest.timeout);
            println!("  max_tries: {}", dest.max_tries);
            println!("  retry_wait: {}", dest.retry_wait);
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    let dest = &config.destination;
    let value = match key {
        "log_level" | "log-level" => config.log_level.as_filter().to_string(),
        "destination.api_key" => optional(dest.api_key.as_deref()),
        "destination.station" => dest.station.to_string(),
        "destination.server_url" => dest.server_url.clone(),
        "destination.protocol" => dest.protocol.to_string(),
        "destination.skip_upload" => dest.skip_upload.to_string(),
        "destination.post_interval" => optional(dest.post_interval),
        "destination.max_backlog" => optional(dest.max_backlog),
        "destination.stale" => optional(dest.stale),
        "destination.timeout" => dest.timeout.to_string(),
        "destination.max_tries" => dest.max_tries.to_string(),
        "destination.retry_wait" => dest.retry_wait.to_string(),
        "destination.log_success" => dest.log_success.to_string(),
        "destination.log_failure" => dest.log_failure.to_string(),
        "destination.user_agent" => dest.user_agent.clone(),
        _ => return None,
    };
    Some(value)
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, &redacted(config)) {
        Some(v) => {
            println!("{}", v);
            Ok(())
        }
        None => Err(eyre!("Unknown config key: {}", key)),
    }
}
