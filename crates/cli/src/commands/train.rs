// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd train` - the on-node entry point.
//!
//! Invoked by the controller as `herd train <bucket> <job_dir>`. Runs the
//! serialized work unit; on SIGTERM (preemption) publishes PREEMPTED and
//! exits 0 so the shutdown script can let the VM go.

use anyhow::{bail, Result};
use clap::Args;
use herd_core::SystemClock;
use herd_engine::{RemoteRunner, TrainerRegistry};
use herd_store::GcsStore;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Args)]
pub struct TrainArgs {
    /// Bucket holding the experiment
    pub bucket_name: String,
    /// Attempt directory containing `function_call.pkl`
    pub job_dir: String,
}

pub async fn run(args: TrainArgs) -> Result<()> {
    let store = GcsStore::new(&args.bucket_name);
    let runner = RemoteRunner::new(
        store,
        SystemClock,
        TrainerRegistry::with_builtins(),
        &args.job_dir,
    );

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        outcome = runner.run() => {
            let outcome = outcome?;
            if outcome.is_failure() {
                bail!("trainer failed: {:?}", outcome);
            }
            Ok(())
        }
        _ = sigterm.recv() => {
            runner.publish_preempted().await?;
            Ok(())
        }
    }
}
