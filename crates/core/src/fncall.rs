// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The serialized work unit shipped to a node before launch.

use crate::codec::{self, CodecError};
use crate::trainstate::TrainState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reference to a trainer implementation, resolved on the node through the
/// string-keyed trainer registry. Replaces dynamic class lookup with data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerHandle {
    pub module: String,
    pub class: String,
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl TrainerHandle {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: class.into(),
            config: HashMap::new(),
        }
    }

    /// Registry key, `<module>:<class>`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.module, self.class)
    }
}

impl fmt::Display for TrainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.class)
    }
}

/// Either an inline train state or an object-store path to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainStateRef {
    Inline(TrainState),
    Path(String),
}

/// What came out of invoking the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The call has not produced anything yet.
    NotAvailable,
    /// The call finished without producing a value.
    Failure,
    /// The call exceeded its budget.
    Timeout,
    /// The trainer raised; the text is the formatted error.
    Exception(String),
    /// Opaque successful output.
    Value(Vec<u8>),
}

impl JobOutcome {
    pub fn is_available(&self) -> bool {
        !matches!(self, JobOutcome::NotAvailable)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failure | JobOutcome::Exception(_))
    }
}

impl Default for JobOutcome {
    fn default() -> Self {
        JobOutcome::NotAvailable
    }
}

/// The unit of work uploaded to `<job_dir>/function_call.pkl` at arming
/// time and hydrated by the node-side runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub trainer: TrainerHandle,
    pub trainstate: TrainStateRef,
    #[serde(default)]
    pub kwargs: HashMap<String, String>,
    #[serde(default)]
    pub outputs: JobOutcome,
    #[serde(default)]
    pub tpu_name: String,
}

impl FunctionCall {
    pub fn new(trainer: TrainerHandle, trainstate: TrainStateRef) -> Self {
        Self {
            trainer,
            trainstate,
            kwargs: HashMap::new(),
            outputs: JobOutcome::NotAvailable,
            tpu_name: String::new(),
        }
    }

    pub fn with_node(mut self, tpu_name: impl Into<String>) -> Self {
        self.tpu_name = tpu_name.into();
        self
    }

    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    pub fn deserialize(blob: &[u8]) -> Result<Self, CodecError> {
        codec::decode(blob)
    }

    /// Serialize just the outcome, for `function_output.pkl`.
    pub fn serialize_outputs(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(&self.outputs)
    }
}

#[cfg(test)]
#[path = "fncall_tests.rs"]
mod tests;
