// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd - supervisor CLI for preemptible accelerator training jobs

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{cleanup, experiments, jobs, nanny, nodes, submit, train};
use config::HerdConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "herd",
    version,
    about = "herd - keeps preemptible accelerator training jobs alive"
)]
struct Cli {
    /// Config file with zones, cloud defaults, and command templates
    #[arg(long, global = true, value_name = "FILE", default_value = "herd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one job descriptor per distributed rank (does not launch)
    Submit(submit::SubmitArgs),
    /// Supervise every job discovered under an experiment directory
    Nanny(nanny::NannyArgs),
    /// On-node entry point: execute a serialized work unit
    Train(train::TrainArgs),
    /// List job state records in a bucket
    Jobs(jobs::JobsArgs),
    /// List the latest checkpoint per experiment
    Experiments(experiments::ExperimentsArgs),
    /// Inspect or delete accelerator nodes across configured zones
    Nodes(nodes::NodesArgs),
    /// Mark filtered jobs as FAILURE, or wipe their directories
    Cleanup(cleanup::CleanupArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = HerdConfig::load(&cli.config)?;

    match cli.command {
        Commands::Nanny(args) => {
            logging::init_nanny(&args.experiment_directory)?;
            nanny::run(args, &config).await
        }
        Commands::Submit(args) => {
            logging::init_stderr();
            submit::run(args, &config, std::env::var("WANDB_API_KEY").ok())
        }
        Commands::Train(args) => {
            logging::init_stderr();
            train::run(args).await
        }
        Commands::Jobs(args) => {
            logging::init_stderr();
            jobs::run(args, &config).await
        }
        Commands::Experiments(args) => {
            logging::init_stderr();
            experiments::run(args, &config).await
        }
        Commands::Nodes(args) => {
            logging::init_stderr();
            nodes::run(args, &config).await
        }
        Commands::Cleanup(args) => {
            logging::init_stderr();
            cleanup::run(args, &config).await
        }
    }
}
