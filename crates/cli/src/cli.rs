//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Capture Agent - hourly photos tagged with live sensor readings
#[derive(Parser, Debug)]
#[command(
    name = "capture-agent",
    author,
    version,
    about = "MQTT-driven photo capture agent",
    long_about = "Takes one photo per period with the LED switched on over MQTT,\n\
                  embeds the latest sensor reading in the EXIF metadata and\n\
                  uploads the tagged copy to cloud storage."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CAPTURE_AGENT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CAPTURE_AGENT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level used when RUST_LOG is not set
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture agent until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration (secrets redacted)
    Info(InfoArgs),

    /// Print the sensor reading embedded in a tagged photo
    Inspect(InspectArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "CAPTURE_AGENT_CONFIG"
    )]
    pub config: PathBuf,

    /// Override MQTT broker host from configuration
    #[arg(long, env = "CAPTURE_AGENT_MQTT_HOST")]
    pub host: Option<String>,

    /// Override MQTT broker port from configuration
    #[arg(long, env = "CAPTURE_AGENT_MQTT_PORT")]
    pub port: Option<u16>,

    /// Run a single capture cycle and exit
    ///
    /// Waits up to 10 s for the first sensor reading before the cycle starts;
    /// without one the LED is restored to off.
    #[arg(long)]
    pub once: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Seconds to wait for the tasks to stop after a shutdown signal
    #[arg(long, default_value = "30", env = "CAPTURE_AGENT_GRACE_SECS")]
    pub grace_secs: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CAPTURE_AGENT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Tagged JPEG to read
    pub file: PathBuf,

    /// Exif tag id holding the reading
    #[arg(long, default_value = "42036")]
    pub tag_id: u16,

    /// Pretty-print the reading when it is valid JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
