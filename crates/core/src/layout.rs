// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store and local filesystem layout.
//!
//! Every path the supervisor, registry, and node-side runner agree on is
//! built here so the layout has exactly one spelling.

use std::path::{Path, PathBuf};

/// File name of the authoritative state record inside a job directory.
pub const JOBSTATE_FILE: &str = "jobstate.yml";

/// File name of the serialized work unit inside a job directory.
pub const FUNCTION_CALL_FILE: &str = "function_call.pkl";

/// File name of the optional terminal output inside a job directory.
pub const FUNCTION_OUTPUT_FILE: &str = "function_output.pkl";

/// Prefix of checkpoint objects inside an experiment directory.
pub const TRAINSTATE_PREFIX: &str = "trainstate";

/// Name of the liveness blob inside an experiment directory.
pub const HEARTBEAT_FILE: &str = "heartbeat";

/// Local directory (under the experiment directory) holding job specs and logs.
pub const LOGS_DIR: &str = "Logs";

/// Object-store directory for one run attempt.
pub fn job_dir(experiment_dir: &str, job_id: &str) -> String {
    format!("{}/{}", experiment_dir.trim_end_matches('/'), job_id)
}

/// `<experiment_dir>/<job_id>/jobstate.yml`
pub fn jobstate_path(experiment_dir: &str, job_id: &str) -> String {
    format!("{}/{}", job_dir(experiment_dir, job_id), JOBSTATE_FILE)
}

/// `<experiment_dir>/<job_id>/function_call.pkl`
pub fn function_call_path(experiment_dir: &str, job_id: &str) -> String {
    format!("{}/{}", job_dir(experiment_dir, job_id), FUNCTION_CALL_FILE)
}

/// `<experiment_dir>/<job_id>/function_output.pkl`
pub fn function_output_path(experiment_dir: &str, job_id: &str) -> String {
    format!("{}/{}", job_dir(experiment_dir, job_id), FUNCTION_OUTPUT_FILE)
}

/// `<experiment_dir>/heartbeat`
pub fn heartbeat_path(experiment_dir: &str) -> String {
    format!(
        "{}/{}",
        experiment_dir.trim_end_matches('/'),
        HEARTBEAT_FILE
    )
}

/// List prefix matching every checkpoint in an experiment directory.
pub fn trainstate_prefix(experiment_dir: &str) -> String {
    format!(
        "{}/{}",
        experiment_dir.trim_end_matches('/'),
        TRAINSTATE_PREFIX
    )
}

/// `<experiment_dir>/trainstate-<step>`
pub fn trainstate_path(experiment_dir: &str, step: u64) -> String {
    format!("{}-{}", trainstate_prefix(experiment_dir), step)
}

/// Derive the jobstate path for a job directory (as passed to the runner).
pub fn jobstate_path_in(job_dir: &str) -> String {
    format!("{}/{}", job_dir.trim_end_matches('/'), JOBSTATE_FILE)
}

/// Derive the function-call path for a job directory.
pub fn function_call_path_in(job_dir: &str) -> String {
    format!("{}/{}", job_dir.trim_end_matches('/'), FUNCTION_CALL_FILE)
}

/// Derive the function-output path for a job directory.
pub fn function_output_path_in(job_dir: &str) -> String {
    format!("{}/{}", job_dir.trim_end_matches('/'), FUNCTION_OUTPUT_FILE)
}

/// The experiment directory a job directory belongs to.
pub fn experiment_dir_of(job_dir: &str) -> String {
    let trimmed = job_dir.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => trimmed.to_string(),
    }
}

/// Local `<experiment_dir>/Logs` directory.
pub fn logs_dir(experiment_dir: &Path) -> PathBuf {
    experiment_dir.join(LOGS_DIR)
}

/// Local `<experiment_dir>/Logs/job-<rank>.pkl` spec blob.
pub fn job_spec_file(experiment_dir: &Path, rank: u32) -> PathBuf {
    logs_dir(experiment_dir).join(format!("job-{}.pkl", rank))
}

/// Local multiplexed remote stdout log.
pub fn job_log_file(experiment_dir: &Path) -> PathBuf {
    logs_dir(experiment_dir).join("job-log.txt")
}

/// Local multiplexed remote stderr log.
pub fn job_err_file(experiment_dir: &Path) -> PathBuf {
    logs_dir(experiment_dir).join("job-err.txt")
}

/// Local supervisor transcript.
pub fn nanny_log_file(experiment_dir: &Path) -> PathBuf {
    logs_dir(experiment_dir).join("nanny-log.txt")
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
