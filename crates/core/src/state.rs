// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle states and the authoritative `jobstate.yml` record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state of a job attempt.
///
/// Serialized to the wire as the integer codes below; unknown codes decode
/// to [`JobState::Unknown`] so a stale or corrupt record never panics an
/// observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Running,
    Success,
    Failure,
    Aborted,
    Timeout,
    Starting,
    Preempted,
    Armed,
    Unknown,
}

impl JobState {
    /// Wire integer code for `jobstate.yml`.
    pub fn code(self) -> i32 {
        match self {
            JobState::Running => 0,
            JobState::Success => 1,
            JobState::Failure => 2,
            JobState::Aborted => 3,
            JobState::Timeout => 4,
            JobState::Starting => 5,
            JobState::Preempted => 6,
            JobState::Armed => 7,
            JobState::Unknown => -1,
        }
    }

    /// Decode a wire integer code. Unknown codes map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => JobState::Running,
            1 => JobState::Success,
            2 => JobState::Failure,
            3 => JobState::Aborted,
            4 => JobState::Timeout,
            5 => JobState::Starting,
            6 => JobState::Preempted,
            7 => JobState::Armed,
            _ => JobState::Unknown,
        }
    }

    /// Terminal states never transition again within an attempt.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Success
                | JobState::Failure
                | JobState::Aborted
                | JobState::Timeout
                | JobState::Preempted
        )
    }

    /// States that mark a node as busy in the pool derivation.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobState::Starting | JobState::Armed | JobState::Running
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Running => "RUNNING",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
            JobState::Aborted => "ABORTED",
            JobState::Timeout => "TIMEOUT",
            JobState::Starting => "STARTING",
            JobState::Preempted => "PREEMPTED",
            JobState::Armed => "ARMED",
            JobState::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// Error parsing a state name (e.g. a CLI `--filter` value).
#[derive(Debug, Error)]
#[error("unknown job state: {0}")]
pub struct ParseStateError(String);

impl FromStr for JobState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(JobState::Running),
            "SUCCESS" => Ok(JobState::Success),
            "FAILURE" => Ok(JobState::Failure),
            "ABORTED" => Ok(JobState::Aborted),
            "TIMEOUT" => Ok(JobState::Timeout),
            "STARTING" => Ok(JobState::Starting),
            "PREEMPTED" => Ok(JobState::Preempted),
            "ARMED" => Ok(JobState::Armed),
            "UNKNOWN" => Ok(JobState::Unknown),
            other => Err(ParseStateError(other.to_string())),
        }
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(d)?;
        Ok(JobState::from_code(code))
    }
}

/// The authoritative status record at `<experiment_dir>/<job_id>/jobstate.yml`.
///
/// Written over in place on every transition; observers derive all truth
/// from this record plus heartbeat freshness, never from process memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStateRecord {
    pub state: JobState,
    #[serde(default)]
    pub tpu_name: String,
}

impl JobStateRecord {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            tpu_name: String::new(),
        }
    }

    pub fn with_node(state: JobState, tpu_name: impl Into<String>) -> Self {
        Self {
            state,
            tpu_name: tpu_name.into(),
        }
    }

    /// Render the YAML wire form.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parse the YAML wire form.
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
