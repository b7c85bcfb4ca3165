//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::tracker::{MergePolicy, TrackerSettings, DEFAULT_KEY_PREFIX};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "course-timer")]
#[command(about = "Per-course elapsed-time tracker with durable write-through persistence")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// JSON file used as the durable store (in-memory when omitted)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Prefix prepended to course ids to form storage keys
    #[arg(long, default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,

    /// Tick interval in milliseconds (at most one hour)
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..=3_600_000))]
    pub tick_ms: u64,

    /// Number of ticks between redundant flushes
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub flush_every: u32,

    /// How a resync reconciles stored and in-memory values
    #[arg(long, value_enum, default_value_t = MergePolicy::Adopt)]
    pub merge_policy: MergePolicy,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Tracker settings derived from the command line
    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            key_prefix: self.key_prefix.clone(),
            tick_interval: Duration::from_millis(self.tick_ms),
            flush_every: self.flush_every,
            merge_policy: self.merge_policy,
        }
    }
}
