// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd cleanup` - mark filtered jobs FAILURE, or wipe their directories.

use crate::config::HerdConfig;
use anyhow::Result;
use clap::Args;
use herd_core::{JobState, JobStateRecord, SystemClock};
use herd_store::{GcsStore, JobRegistry, ObjectStore};

#[derive(Args)]
pub struct CleanupArgs {
    /// Bucket to clean (defaults to the configured cloud bucket)
    pub bucket: Option<String>,
    /// Only touch records in this state (e.g. RUNNING, UNKNOWN)
    #[arg(long)]
    pub filter: Option<JobState>,
    /// Delete the attempt directories instead of marking FAILURE
    #[arg(long)]
    pub wipe: bool,
}

pub async fn run(args: CleanupArgs, config: &HerdConfig) -> Result<()> {
    let bucket = args.bucket.unwrap_or_else(|| config.cloud.bucket.clone());
    let store = GcsStore::new(bucket);
    let registry = JobRegistry::new(store.clone(), SystemClock);

    let filters: Vec<JobState> = args.filter.into_iter().collect();
    for record in registry.list_jobs(&filters).await? {
        if args.wipe {
            println!("wiping {}", record.job_dir);
            store.delete_prefix(&record.job_dir).await?;
        } else {
            println!("setting {} to FAILURE", record.job_dir);
            let failed = JobStateRecord::with_node(JobState::Failure, &record.record.tpu_name);
            store
                .upload(&record.path, failed.to_yaml()?.as_bytes(), true)
                .await?;
        }
    }
    Ok(())
}
