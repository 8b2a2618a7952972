//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sics", version, about = "MT-SICS balance driver")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty, and report errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins if set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the driver and stream events as JSON lines on stdout
    ///
    /// Control lines are read from stdin: `sample <id>`, `send <text>`,
    /// `open`, `close`, `snapshot`.
    Run {
        /// Talk to the built-in simulated balance instead of a serial port
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Override serial.port
        #[arg(long, value_name = "PATH")]
        port: Option<String>,
        /// Override serial.baud_rate
        #[arg(long, value_name = "BAUD")]
        baud: Option<u32>,
        /// Stop after this many milliseconds (default: run until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Request one tagged sample right after opening
        #[arg(long, value_name = "ID")]
        sample: Option<String>,
    },
    /// Open the link, wait for Online and print the meter configuration as JSON
    SelfCheck {
        /// Check against the built-in simulated balance
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Give up if the balance is not Online within this many milliseconds
        #[arg(long, value_name = "MS", default_value_t = 5000)]
        timeout_ms: u64,
    },
}

/// Failures raised by the CLI itself.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("balance not online after {0} ms")]
    SelfCheckTimeout(u64),
    #[error("link closed during self-check: {0}")]
    SelfCheckClosed(String),
    #[error("serial support not compiled in")]
    NoSerialSupport,
}
