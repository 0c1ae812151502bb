// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Training state carried between run attempts.

use crate::codec::{self, CodecError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One opaque section of trainer state (model weights, optimizer moments,
/// scheduler counters). The supervisor never interprets the bytes; the
/// trainer-side codec owns the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateSection {
    NotAvailable,
    Bytes(Vec<u8>),
}

impl StateSection {
    pub fn is_available(&self) -> bool {
        matches!(self, StateSection::Bytes(_))
    }
}

impl Default for StateSection {
    fn default() -> Self {
        StateSection::NotAvailable
    }
}

/// Snapshot of training progress, persisted to
/// `<experiment_dir>/trainstate-<step>` at checkpoint intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainState {
    pub step: u64,
    pub epoch: u64,
    pub model: StateSection,
    pub losses: StateSection,
    pub optims: StateSection,
    pub schedulers: StateSection,
    #[serde(default)]
    pub misc: HashMap<String, String>,
}

impl TrainState {
    /// Fresh state for a job that has never checkpointed.
    pub fn initial() -> Self {
        Self {
            step: 0,
            epoch: 0,
            model: StateSection::NotAvailable,
            losses: StateSection::NotAvailable,
            optims: StateSection::NotAvailable,
            schedulers: StateSection::NotAvailable,
            misc: HashMap::new(),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    pub fn deserialize(blob: &[u8]) -> Result<Self, CodecError> {
        codec::decode(blob)
    }
}

impl fmt::Display for TrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainState(step={}, epoch={})", self.step, self.epoch)
    }
}

#[cfg(test)]
#[path = "trainstate_tests.rs"]
mod tests;
