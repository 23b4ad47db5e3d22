//! CLI argument parsing using clap 4.x derive macros

pub mod run;

use agentic_sim_core::SimKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Terminal simulations of agentic AI system patterns
///
/// Replays an agent request lifecycle, a tiered semantic router, latency
/// masking, human approval of a sensitive tool call and a signal monitor.
/// Without a command the interactive TUI is started.
#[derive(Parser, Debug)]
#[command(name = "agentic-sim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Playback speed factor (2.0 plays twice as fast)
    #[arg(short, long, global = true)]
    pub speed: Option<f64>,

    /// Use this config file instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one simulation headless, streaming its log to stdout
    Run {
        /// agent, tiered, latency, governance or signal
        sim: SimKind,

        /// Route this scenario instead of a random one (tiered only)
        #[arg(long)]
        scenario: Option<String>,

        /// Seed for scenario selection (tiered only)
        #[arg(long)]
        seed: Option<u64>,

        /// Approve the intercepted call (governance only)
        #[arg(long, conflicts_with = "reject")]
        approve: bool,

        /// Reject the intercepted call (governance only)
        #[arg(long)]
        reject: bool,

        /// Number of loops to watch (signal only)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=1000))]
        cycles: u32,
    },

    /// List the routing scenarios
    Scenarios,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
