// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI configuration loaded from `herd.toml`.

use anyhow::{Context, Result};
use herd_core::spec::{DEFAULT_HEARTBEAT_TIMEOUT_SECS, DEFAULT_SSH_TIMEOUT_SECS};
use herd_core::CloudParams;
use serde::Deserialize;
use std::path::Path;

/// Top-level config. Every section has workable defaults so a missing
/// file still yields a usable CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HerdConfig {
    /// Zones scanned by `nodes` and `nodes delete-all`.
    #[serde(default = "default_zones")]
    pub zones: Vec<String>,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub job: JobConfig,
}

fn default_zones() -> Vec<String> {
    vec!["us-central1-f".to_string(), "europe-west4-a".to_string()]
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            zones: default_zones(),
            cloud: CloudConfig::default(),
            job: JobConfig::default(),
        }
    }
}

/// Default cloud placement for submitted jobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    #[serde(default = "d_zone")]
    pub zone: String,
    #[serde(default = "d_network")]
    pub network: String,
    #[serde(default = "d_subnet")]
    pub subnet: String,
    #[serde(default = "d_range")]
    pub range: String,
    #[serde(default = "d_acc_type")]
    pub acc_type: String,
    #[serde(default)]
    pub preemptible: bool,
    #[serde(default = "d_bucket")]
    pub bucket: String,
    #[serde(default = "d_project")]
    pub project: String,
}

fn d_zone() -> String {
    "us-central1-f".to_string()
}
fn d_network() -> String {
    "tpu-network".to_string()
}
fn d_subnet() -> String {
    "swarm-2".to_string()
}
fn d_range() -> String {
    "192.170.0.0/29".to_string()
}
fn d_acc_type() -> String {
    "v3-8".to_string()
}
fn d_bucket() -> String {
    "must-results".to_string()
}
fn d_project() -> String {
    "polytax".to_string()
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            zone: d_zone(),
            network: d_network(),
            subnet: d_subnet(),
            range: d_range(),
            acc_type: d_acc_type(),
            preemptible: false,
            bucket: d_bucket(),
            project: d_project(),
        }
    }
}

/// Command templates and budgets stamped onto submitted job specs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub setup: Vec<String>,
    #[serde(default = "d_install")]
    pub install: String,
    #[serde(default = "d_train")]
    pub train: String,
    #[serde(default)]
    pub cleanup: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default = "d_world_size")]
    pub world_size: u32,
    #[serde(default = "d_nprocs")]
    pub nprocs: u32,
    #[serde(default = "d_steps")]
    pub num_train_steps: u64,
    #[serde(default = "d_interval")]
    pub checkpoint_interval: u64,
    #[serde(default = "d_heartbeat")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "d_ssh")]
    pub ssh_timeout_secs: u64,
}

fn d_install() -> String {
    "pip install -e .".to_string()
}
fn d_train() -> String {
    "herd train".to_string()
}
fn d_world_size() -> u32 {
    1
}
fn d_nprocs() -> u32 {
    8
}
fn d_steps() -> u64 {
    10_000
}
fn d_interval() -> u64 {
    500
}
fn d_heartbeat() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT_SECS
}
fn d_ssh() -> u64 {
    DEFAULT_SSH_TIMEOUT_SECS
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            setup: Vec::new(),
            install: d_install(),
            train: d_train(),
            cleanup: Vec::new(),
            env: Vec::new(),
            world_size: d_world_size(),
            nprocs: d_nprocs(),
            num_train_steps: d_steps(),
            checkpoint_interval: d_interval(),
            heartbeat_timeout_secs: d_heartbeat(),
            ssh_timeout_secs: d_ssh(),
        }
    }
}

impl HerdConfig {
    /// Load config from the given path; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Cloud placement parameters for a submitted job.
    pub fn cloud_params(&self) -> CloudParams {
        CloudParams {
            zone: self.cloud.zone.clone(),
            network: self.cloud.network.clone(),
            subnet: self.cloud.subnet.clone(),
            range: self.cloud.range.clone(),
            acc_type: self.cloud.acc_type.clone(),
            preemptible: self.cloud.preemptible,
            bucket: self.cloud.bucket.clone(),
            project: self.cloud.project.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
