// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd jobs` - list job state records in a bucket.

use crate::config::HerdConfig;
use anyhow::Result;
use clap::Args;
use herd_core::{JobState, SystemClock};
use herd_store::{GcsStore, JobRegistry};

#[derive(Args)]
pub struct JobsArgs {
    /// Bucket to scan (defaults to the configured cloud bucket)
    pub bucket: Option<String>,
    /// Only show records in this state (e.g. RUNNING, FAILURE)
    #[arg(long)]
    pub filter: Option<JobState>,
}

pub async fn run(args: JobsArgs, config: &HerdConfig) -> Result<()> {
    let bucket = args.bucket.unwrap_or_else(|| config.cloud.bucket.clone());
    let registry = JobRegistry::new(GcsStore::new(bucket), SystemClock);

    let filters: Vec<JobState> = args.filter.into_iter().collect();
    let mut records = registry.list_jobs(&filters).await?;
    records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));

    for record in &records {
        println!(
            "{:<10} {:<16} {}  updated {}",
            record.record.state.to_string(),
            record.record.tpu_name,
            record.job_dir,
            record.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    println!("{} job(s)", records.len());
    Ok(())
}
