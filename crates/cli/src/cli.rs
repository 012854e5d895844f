//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Frame Broadcaster - publish camera frames to TCP subscribers
#[derive(Parser, Debug)]
#[command(
    name = "frame-broadcaster",
    author,
    version,
    about = "Video frame broadcaster",
    long_about = "Captures encoded video frames and publishes each one to a fixed group of \n\
                  TCP endpoints as `topic | frame index (u64 LE) | payload`.\n\n\
                  Subscribers filter on the topic prefix; a debug filter can withhold \n\
                  every n-th frame to exercise frame-loss handling downstream."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FRAME_BROADCASTER_VERBOSE")]
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
        env = "FRAME_BROADCASTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture frames and publish them
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Connect to a publish endpoint and print received frames
    Subscribe(SubscribeArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "broadcaster.toml",
        env = "FRAME_BROADCASTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the publish topic
    #[arg(long, env = "FRAME_BROADCASTER_TOPIC")]
    pub topic: Option<String>,

    /// Override the first endpoint port
    #[arg(long, env = "FRAME_BROADCASTER_BASE_PORT")]
    pub base_port: Option<u16>,

    /// Override the number of identical endpoints
    #[arg(long, env = "FRAME_BROADCASTER_DUPLICATION")]
    pub duplication: Option<usize>,

    /// Override the debug drop divisor (0 disables)
    #[arg(long, env = "FRAME_BROADCASTER_DROP_NTH_FRAME")]
    pub drop_nth_frame: Option<u64>,

    /// Stop after this many captured frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "FRAME_BROADCASTER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FRAME_BROADCASTER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FRAME_BROADCASTER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Seconds between throughput reports
    #[arg(long, default_value = "5", env = "FRAME_BROADCASTER_REPORT_INTERVAL")]
    pub report_interval: u64,

    /// Validate configuration and exit without binding anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "broadcaster.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "broadcaster.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `subscribe` command
#[derive(Parser, Debug)]
pub struct SubscribeArgs {
    /// Publish endpoint to connect to
    #[arg(long, default_value = "127.0.0.1:5555", env = "FRAME_BROADCASTER_ADDR")]
    pub addr: SocketAddr,

    /// Topic prefix to filter on
    #[arg(long, default_value = "cam1", env = "FRAME_BROADCASTER_TOPIC")]
    pub topic: String,

    /// Exit after this many frames (0 = until the publisher closes)
    #[arg(long, default_value = "0")]
    pub count: u64,

    /// Print one JSON object per frame
    #[arg(long)]
    pub json: bool,
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
