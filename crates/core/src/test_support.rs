// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for tests in this crate and downstream crates.

use crate::fncall::TrainerHandle;
use crate::spec::{
    CloudParams, JobSpec, DEFAULT_HEARTBEAT_TIMEOUT_SECS, DEFAULT_SSH_TIMEOUT_SECS,
};
use std::collections::HashMap;

/// Cloud parameters pointing at a throwaway test project.
pub fn cloud_fixture() -> CloudParams {
    CloudParams {
        zone: "us-central1-f".to_string(),
        network: "tpu-network".to_string(),
        subnet: "swarm-2".to_string(),
        range: "192.170.0.0/29".to_string(),
        acc_type: "v3-8".to_string(),
        preemptible: true,
        bucket: "test-results".to_string(),
        project: "polytax".to_string(),
    }
}

/// A complete JobSpec for one rank of a small training job.
pub fn spec_fixture(experiment_directory: &str, rank: u32) -> JobSpec {
    JobSpec {
        id: format!("spec-{}-{}", experiment_directory.replace('/', "-"), rank),
        name: experiment_directory.to_string(),
        experiment_directory: experiment_directory.to_string(),
        trainer: TrainerHandle::new("herd.trainers", "Counter"),
        setup_cmds: vec!["git pull".to_string()],
        install_cmd: "pip install -e .".to_string(),
        train_cmd: "herd train".to_string(),
        cleanup_cmds: vec![],
        env_stmts: vec!["export XRT_TPU_CONFIG=localservice;".to_string()],
        world_size: 1,
        rank,
        nprocs: 1,
        num_train_steps: 10,
        checkpoint_interval: 5,
        heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
        ssh_timeout_secs: DEFAULT_SSH_TIMEOUT_SECS,
        kwargs: HashMap::new(),
        cloud: cloud_fixture(),
    }
}
