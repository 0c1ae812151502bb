// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd submit` - write one job descriptor per distributed rank.

use crate::config::HerdConfig;
use anyhow::{Context, Result};
use clap::Args;
use herd_core::layout;
use herd_core::{IdGen, JobSpec, TrainerHandle, UuidIdGen};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Args)]
pub struct SubmitArgs {
    /// Trainer module path (registry key prefix)
    pub trainer_module: String,
    /// Trainer class name (registry key suffix)
    pub trainer_class: String,
    /// Experiment directory: object-store namespace and local logs root
    #[arg(long, value_name = "DIR")]
    pub experiment_dir: PathBuf,
    /// Distributed world size (one descriptor per rank)
    #[arg(long)]
    pub world_size: Option<u32>,
    /// Trainer config entries, `key=value` (repeatable)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
    /// Recorded for the secondary slurm path; unused by this supervisor
    #[arg(long)]
    pub mem_gb: Option<u32>,
    /// Recorded for the secondary slurm path; unused by this supervisor
    #[arg(long)]
    pub cpus_per_task: Option<u32>,
    /// Recorded for the secondary slurm path; unused by this supervisor
    #[arg(long)]
    pub slurm_gres: Option<String>,
}

pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

pub fn run(args: SubmitArgs, config: &HerdConfig, wandb_api_key: Option<String>) -> Result<()> {
    let experiment_directory = args
        .experiment_dir
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string();
    let world_size = args.world_size.unwrap_or(config.job.world_size);

    let mut trainer = TrainerHandle::new(&args.trainer_module, &args.trainer_class);
    trainer.config.extend(args.set.iter().cloned());

    // Secrets cross the boundary as explicit env statements on the spec,
    // never through ambient process environment.
    let mut env_stmts = config.job.env.clone();
    if let Some(key) = wandb_api_key {
        env_stmts.push(format!("export WANDB_API_KEY={};", key));
    }

    let mut kwargs = HashMap::new();
    if let Some(mem_gb) = args.mem_gb {
        kwargs.insert("mem_gb".to_string(), mem_gb.to_string());
    }
    if let Some(cpus) = args.cpus_per_task {
        kwargs.insert("cpus_per_task".to_string(), cpus.to_string());
    }
    if let Some(gres) = args.slurm_gres {
        kwargs.insert("slurm_gres".to_string(), gres);
    }

    let id_gen = UuidIdGen;
    for rank in 0..world_size {
        let spec = JobSpec {
            id: id_gen.next(),
            name: experiment_directory.clone(),
            experiment_directory: experiment_directory.clone(),
            trainer: trainer.clone(),
            setup_cmds: config.job.setup.clone(),
            install_cmd: config.job.install.clone(),
            train_cmd: config.job.train.clone(),
            cleanup_cmds: config.job.cleanup.clone(),
            env_stmts: env_stmts.clone(),
            world_size,
            rank,
            nprocs: config.job.nprocs,
            num_train_steps: config.job.num_train_steps,
            checkpoint_interval: config.job.checkpoint_interval,
            heartbeat_timeout_secs: config.job.heartbeat_timeout_secs,
            ssh_timeout_secs: config.job.ssh_timeout_secs,
            kwargs: kwargs.clone(),
            cloud: config.cloud_params(),
        };

        let path = layout::job_spec_file(&args.experiment_dir, rank);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, spec.serialize()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("created job-{} at {}", rank, path.display());
    }

    Ok(())
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
