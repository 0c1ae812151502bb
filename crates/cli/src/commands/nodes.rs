// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd nodes` - inspect or delete accelerator nodes across zones.

use crate::config::HerdConfig;
use anyhow::Result;
use clap::{Args, Subcommand};
use herd_adapters::{GcloudDriver, NodeDriver};

#[derive(Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: Option<NodesCommand>,
}

#[derive(Subcommand)]
pub enum NodesCommand {
    /// List nodes in every configured zone (default)
    List {
        /// Also resolve each READY node's first network endpoint
        #[arg(long)]
        ip: bool,
    },
    /// Delete every READY node in the configured zones
    DeleteAll,
}

pub async fn run(args: NodesArgs, config: &HerdConfig) -> Result<()> {
    let driver = GcloudDriver::new();
    match args.command.unwrap_or(NodesCommand::List { ip: false }) {
        NodesCommand::List { ip } => list(&driver, config, ip).await,
        NodesCommand::DeleteAll => delete_all(&driver, config).await,
    }
}

async fn list(driver: &GcloudDriver, config: &HerdConfig, with_ip: bool) -> Result<()> {
    for zone in &config.zones {
        for node in driver.list(zone).await? {
            if with_ip && node.is_ready() {
                let ip = driver.ip_address(&node.name, zone).await?;
                println!("{}\t{}\t{}\t{}", node.name, node.status, zone, ip);
            } else {
                println!("{}\t{}\t{}", node.name, node.status, zone);
            }
        }
    }
    Ok(())
}

async fn delete_all(driver: &GcloudDriver, config: &HerdConfig) -> Result<()> {
    for zone in &config.zones {
        for node in driver.list(zone).await? {
            if node.is_ready() {
                println!("deleting {} in {}", node.name, zone);
                driver.delete(&node.name, zone).await?;
            }
        }
    }
    Ok(())
}
