// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptors written by the submitter and discovered by the supervisor.

use crate::codec::{self, CodecError};
use crate::fncall::TrainerHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default heartbeat window before a RUNNING job is declared dead (seconds).
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 300;

/// Default timeout for a single captured SSH command (seconds).
pub const DEFAULT_SSH_TIMEOUT_SECS: u64 = 300;

/// Cloud placement parameters for the node a job runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudParams {
    pub zone: String,
    pub network: String,
    pub subnet: String,
    pub range: String,
    pub acc_type: String,
    pub preemptible: bool,
    pub bucket: String,
    pub project: String,
}

/// Immutable description of one distributed rank of a training job.
///
/// Serialized to `<experiment_dir>/Logs/job-<rank>.pkl` at submission time
/// and never mutated afterwards; every run attempt re-reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Stable id shared by all attempts of this rank.
    pub id: String,
    /// Human-readable name (experiment name by default).
    pub name: String,
    /// Object-store namespace for checkpoints and attempt artifacts.
    pub experiment_directory: String,
    pub trainer: TrainerHandle,
    /// Commands run before install/train; rc==1 from any of them triggers
    /// a single install attempt.
    pub setup_cmds: Vec<String>,
    pub install_cmd: String,
    /// Invoked as `<train_cmd> <bucket> <job_dir>` in stream mode.
    pub train_cmd: String,
    pub cleanup_cmds: Vec<String>,
    /// Shell statements prepended to every remote command.
    pub env_stmts: Vec<String>,
    pub world_size: u32,
    pub rank: u32,
    /// Node-side cooperative workers (one per accelerator core).
    pub nprocs: u32,
    pub num_train_steps: u64,
    pub checkpoint_interval: u64,
    pub heartbeat_timeout_secs: u64,
    pub ssh_timeout_secs: u64,
    /// Free-form passthrough (e.g. recorded resource hints).
    #[serde(default)]
    pub kwargs: HashMap<String, String>,
    pub cloud: CloudParams,
}

impl JobSpec {
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    pub fn deserialize(blob: &[u8]) -> Result<Self, CodecError> {
        codec::decode(blob)
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
