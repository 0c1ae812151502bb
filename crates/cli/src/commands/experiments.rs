// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd experiments` - latest checkpoint per experiment directory.

use crate::config::HerdConfig;
use anyhow::Result;
use clap::Args;
use herd_core::SystemClock;
use herd_store::{GcsStore, JobRegistry};

#[derive(Args)]
pub struct ExperimentsArgs {
    /// Bucket to scan (defaults to the configured cloud bucket)
    pub bucket: Option<String>,
}

pub async fn run(args: ExperimentsArgs, config: &HerdConfig) -> Result<()> {
    let bucket = args.bucket.unwrap_or_else(|| config.cloud.bucket.clone());
    let registry = JobRegistry::new(GcsStore::new(bucket), SystemClock);

    let experiments = registry.list_experiments().await?;
    println!("Found the following experiments:\n");
    for entry in &experiments {
        println!(
            "{}: {}, updated on {}",
            entry.experiment,
            entry.path,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}
