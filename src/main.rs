mod analysis;
mod config;
mod engine;
mod error;
mod manager;
mod metrics;
mod model;
mod network;
mod stats;
mod sweep;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single simulation.
    Run {
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run the parameter sweep.
    Sweep {
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Remove output files.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Run { seed } => mgr.run_single(seed)?,
        Command::Sweep { jobs } => mgr.run_sweep(jobs)?,
        Command::Clean => mgr.clean_outputs()?,
    }

    Ok(())
}
