//! Command-line parsing and validation helpers.

#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};

pub const DEFAULT_COMMAND: &str = "/bin/sh";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_INPUT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_REAP_TIMEOUT_MS: u64 = 500;

/// CLI options for the shellpty host. Validated values keep the spawned command well-formed.
#[derive(Debug, Parser, Clone)]
#[command(about = "shellpty: run a program on a pseudoterminal", author, version)]
pub struct AppConfig {
    /// Absolute path of the program to run (started with no arguments and an empty environment)
    #[arg(
        short = 'c',
        long = "command",
        env = "SHELLPTY_COMMAND",
        default_value = DEFAULT_COMMAND
    )]
    pub command: String,

    /// How long the relay waits for PTY output before checking input again (milliseconds)
    #[arg(long = "poll-interval-ms", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Capacity of the stdin → PTY chunk queue
    #[arg(long = "input-channel-capacity", default_value_t = DEFAULT_INPUT_CHANNEL_CAPACITY)]
    pub input_channel_capacity: usize,

    /// How long to wait for the child to exit after the session closes (milliseconds)
    #[arg(long = "reap-timeout-ms", default_value_t = DEFAULT_REAP_TIMEOUT_MS)]
    pub reap_timeout_ms: u64,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SHELLPTY_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SHELLPTY_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Most verbose level written to the trace file (trace adds per-read/write byte counts)
    #[arg(
        long = "log-level",
        env = "SHELLPTY_LOG_LEVEL",
        value_enum,
        default_value_t = LogLevel::Debug
    )]
    pub log_level: LogLevel,
}

/// Trace file verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl AppConfig {
    /// True when `--logs` is set and not overridden by `--no-logs`.
    pub fn logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }
}
