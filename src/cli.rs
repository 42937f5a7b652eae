use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::request::Protocol;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "wxrelay",
    about = "Relay weather station observations to a remote aggregation service",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/wxrelay/logs/wxrelay.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to wxrelay.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read records as JSON lines and upload them
    Run {
        /// Read records from this file instead of stdin
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Process records without sending anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the requests records would produce, without sending them
    Preview {
        /// Read records from this file instead of stdin
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Override the configured protocol
        #[arg(long, value_enum)]
        protocol: Option<Protocol>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a single configuration value
    Get {
        /// Key, e.g. destination.station
        key: String,
    },
}
