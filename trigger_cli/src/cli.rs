//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "trigger", version, about = "Crank/cam trigger decoder CLI")]
pub struct Cli {
    /// Path to config TOML (typed); built-in 36-1 defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report and log as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the decoder with a simulated wheel at constant speed
    Simulate {
        /// Engine speed to simulate
        #[arg(long, default_value_t = 3_000)]
        rpm: u32,
        /// Crank revolutions to generate
        #[arg(long, default_value_t = 10)]
        revs: u32,
        /// Add a short noise pulse after every Nth primary tooth
        #[arg(long, value_name = "N")]
        noise_every: Option<u32>,
        /// Ignition end angle per channel (repeat for more channels)
        #[arg(long = "angle", value_name = "DEG", allow_negative_numbers = true)]
        angles: Vec<i16>,
    },
    /// Replay a recorded edge trace (CSV with `input,time_us` headers)
    Replay {
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
    },
    /// Print the end tooth for each ignition end angle
    EndTeeth {
        /// Ignition end angle per channel (repeat for more channels)
        #[arg(
            long = "angle",
            value_name = "DEG",
            required = true,
            allow_negative_numbers = true
        )]
        angles: Vec<i16>,
    },
    /// Quick health check: simulate the configured wheel and verify sync and RPM
    SelfCheck,
    /// Decode live edges polled from Raspberry Pi GPIO until Ctrl-C
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    Watch {
        /// BCM pin of the crank sensor
        #[arg(long)]
        primary: u8,
        /// BCM pin of the cam sensor
        #[arg(long)]
        secondary: Option<u8>,
        /// BCM pin of the second cam sensor (VVT2)
        #[arg(long)]
        tertiary: Option<u8>,
        /// Seconds between status lines
        #[arg(long, default_value_t = 1)]
        report_every: u64,
    },
}
