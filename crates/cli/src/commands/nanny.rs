// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd nanny` - run the supervisor loop against an experiment directory.

use crate::config::HerdConfig;
use anyhow::Result;
use clap::Args;
use herd_adapters::GcloudDriver;
use herd_core::SystemClock;
use herd_engine::Supervisor;
use herd_store::GcsStore;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

#[derive(Args)]
pub struct NannyArgs {
    /// Directory scanned for `*/Logs/job-<rank>.pkl` descriptors
    pub experiment_directory: PathBuf,
    /// Bucket override (defaults to the configured cloud bucket)
    #[arg(long)]
    pub bucket: Option<String>,
}

pub async fn run(args: NannyArgs, config: &HerdConfig) -> Result<()> {
    let bucket = args.bucket.unwrap_or_else(|| config.cloud.bucket.clone());
    let store = GcsStore::new(bucket);
    let supervisor = Supervisor::new(
        args.experiment_directory.clone(),
        store,
        GcloudDriver::new(),
        SystemClock,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
        let _ = shutdown_tx.send(true);
    });

    supervisor.run(shutdown_rx).await?;
    Ok(())
}
