use eyre::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ureq::http::Uri;

use crate::delivery::{DeliveryError, DeliverySettings, RetryPolicy};
use crate::request::Protocol;

/// Value shipped in sample configs; treated the same as a missing key
pub const API_KEY_PLACEHOLDER: &str = "replace_me";

pub const DEFAULT_SERVER_URL: &str = "https://stations.windy.com/pws/update";

/// Main wxrelay configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub destination: DestinationConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Where and how records are delivered
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Credential, appended to the endpoint path
    pub api_key: Option<String>,
    /// Station number at the destination (integer or numeric string)
    #[serde(deserialize_with = "deserialize_station")]
    pub station: i64,
    pub server_url: String,
    pub protocol: Protocol,
    /// Dry run: process records but never touch the network
    pub skip_upload: bool,
    /// Minimum seconds between posts; unset posts every record
    pub post_interval: Option<u64>,
    /// Maximum queued records; unset is unbounded
    pub max_backlog: Option<usize>,
    /// Maximum record age in seconds; unset never goes stale
    pub stale: Option<u64>,
    /// Seconds allowed for one HTTP exchange
    pub timeout: u64,
    pub max_tries: u32,
    /// Seconds between attempts
    pub retry_wait: u64,
    pub log_success: bool,
    pub log_failure: bool,
    pub user_agent: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            station: 0,
            server_url: DEFAULT_SERVER_URL.to_string(),
            protocol: Protocol::default(),
            skip_upload: false,
            post_interval: None,
            max_backlog: None,
            stale: None,
            timeout: 60,
            max_tries: 3,
            retry_wait: 5,
            log_success: true,
            log_failure: true,
            user_agent: format!("wxrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn deserialize_station<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Station {
        Number(i64),
        Text(String),
    }

    match Station::deserialize(deserializer)? {
        Station::Number(n) => Ok(n),
        Station::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("station must be an integer, got '{}'", s))),
    }
}

impl DestinationConfig {
    /// The API key, unless it is missing or still the placeholder
    pub fn require_api_key(&self) -> std::result::Result<&str, DeliveryError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != API_KEY_PLACEHOLDER => Ok(key),
            _ => Err(DeliveryError::Configuration("api_key is not set".to_string())),
        }
    }

    /// Everything that would stop the worker from starting
    pub fn validate(&self) -> std::result::Result<(), DeliveryError> {
        self.require_api_key()?;

        self.check_server_url()?;
        if self.max_tries == 0 {
            return Err(DeliveryError::Configuration("max_tries must be at least 1".to_string()));
        }

        Ok(())
    }

    /// An absolute http(s) URL with a host
    fn check_server_url(&self) -> std::result::Result<(), DeliveryError> {
        let url = self.server_url.trim();
        if url.is_empty() {
            return Err(DeliveryError::Configuration("server_url is empty".to_string()));
        }

        let uri: Uri = url
            .parse()
            .map_err(|e| DeliveryError::Configuration(format!("server_url '{}' is not a valid URL: {}", url, e)))?;
        match (uri.scheme_str(), uri.host()) {
            (Some("http" | "https"), Some(host)) if !host.is_empty() => Ok(()),
            _ => Err(DeliveryError::Configuration(format!(
                "server_url '{}' must be an http or https URL",
                url
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            post_interval: self.post_interval.map(Duration::from_secs),
            max_backlog: self.max_backlog,
            stale: self.stale,
            skip_upload: self.skip_upload,
            retry: RetryPolicy::new(self.max_tries, Duration::from_secs(self.retry_wait)),
            ..DeliverySettings::default()
        }
    }

    /// Use `key` when no API key is configured
    pub fn fill_api_key(&mut self, key: Option<String>) {
        if self.require_api_key().is_err()
            && let Some(key) = key.filter(|k| !k.trim().is_empty())
        {
            self.api_key = Some(key);
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::locate(config_path)?;
        config.destination.fill_api_key(std::env::var("WXRELAY_API_KEY").ok());
        Ok(config)
    }

    fn locate(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let path = Self::expand_path(path);
            return Self::load_from_file(&path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check WXRELAY_CONFIG env var
        if let Ok(env_path) = std::env::var("WXRELAY_CONFIG") {
            let path = Self::expand_path(Path::new(&env_path));
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from WXRELAY_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try WXRELAY_DIR/wxrelay.yaml
        if let Ok(dir) = std::env::var("WXRELAY_DIR") {
            let path = PathBuf::from(dir).join("wxrelay.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from WXRELAY_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/wxrelay/wxrelay.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("wxrelay").join("wxrelay.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./wxrelay.yaml (for development)
        let local_config = PathBuf::from("wxrelay.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
