//! `agentic-sim` - terminal simulations of agentic AI system patterns
//!
//! Runs the staged simulations either interactively in a TUI or headless,
//! streaming each simulation's log to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use std::path::Path;
use std::sync::Arc;

use crate::cli::run::{handle_run, RunRequest};
use crate::cli::{Cli, Commands, ConfigCommand};
use agentic_sim_core::analytics::{self, LogSink, SharedSink};
use agentic_sim_core::sims::Decision;
use agentic_sim_core::{info_log, logger, Config};

mod cli;
mod tui;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    if config.debug_log {
        let data_dir = Config::data_dir().context("Could not find data directory")?;
        logger::init(&data_dir);
    }
    info_log!("agentic-sim v{} starting", env!("CARGO_PKG_VERSION"));

    let analytics: SharedSink = if config.analytics {
        Arc::new(LogSink)
    } else {
        analytics::noop()
    };

    match cli.command {
        None => {
            tui::run_tui(&config, analytics).await?;
        }

        Some(Commands::Run {
            sim,
            scenario,
            seed,
            approve,
            reject,
            cycles,
        }) => {
            let decision = match (approve, reject) {
                (true, _) => Some(Decision::Approve),
                (_, true) => Some(Decision::Reject),
                _ => None,
            };
            let request = RunRequest {
                sim,
                scenario,
                seed,
                decision,
                cycles,
            };
            handle_run(request, &config, analytics).await?;
        }

        Some(Commands::Scenarios) => {
            print_scenarios(&config)?;
        }

        Some(Commands::Config { cmd }) => {
            handle_config(cmd, cli.config.as_deref(), &config)?;
        }
    }

    Ok(())
}

/// Load configuration; flags override the file
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        // `config init` may target a file that does not exist yet
        Some(path) if !path.exists() && matches!(cli.command, Some(Commands::Config { .. })) => {
            Config::default()
        }
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default(),
    };
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_scenarios(config: &Config) -> Result<()> {
    let table = config.scenario_table().context("Failed to load scenario table")?;
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    for scenario in table.scenarios() {
        println!(
            "{}  {:<10} {:<16} {}",
            bold.apply_to(&scenario.id),
            scenario.target.as_str(),
            scenario.category,
            scenario.query
        );
        println!(
            "    {} {}",
            dim.apply_to(scenario.latency_saved_label()),
            dim.apply_to(&scenario.explanation)
        );
    }
    Ok(())
}

fn handle_config(cmd: ConfigCommand, explicit: Option<&Path>, config: &Config) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().context("Could not find config directory")?,
    };

    match cmd {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            print!("{}", content);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            Config::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let green = Style::new().green();
            println!("{} {}", green.apply_to("Wrote"), path.display());
        }
    }
    Ok(())
}
