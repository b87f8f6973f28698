//! `harvest`: collect new organization events once, or on a daily schedule.
//!
//! Usage:
//!
//!   harvest [--config config.json] once
//!   harvest [--config config.json] daily [--run-now]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harvester::{logging, run_daily, DailySchedule, HarvestConfig, Harvester};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "harvest", about = "Incremental organization event-feed harvester")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, short, default_value = "config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one harvest and exit (default).
    Once,
    /// Run every day at the configured time until interrupted.
    Daily {
        /// Also run immediately on start.
        #[arg(long)]
        run_now: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HarvestConfig::load(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    let log_file = logging::init(&config.log_dir)?;
    tracing::info!(log_file = %log_file.display(), config = ?config, "configuration loaded");

    match cli.command.unwrap_or(Command::Once) {
        Command::Once => {
            Harvester::from_config(&config)?.run().await?;
        }
        Command::Daily { run_now } => {
            let schedule = DailySchedule::parse(&config.schedule)?;
            run_daily(cli.config, schedule, run_now).await?;
        }
    }
    Ok(())
}
