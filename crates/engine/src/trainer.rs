// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trainer plugin registry.
//!
//! Trainers are resolved from a [`herd_core::TrainerHandle`] through a
//! string-keyed registry instead of dynamic class lookup; the node-side
//! binary registers every trainer it can run at startup.

use herd_core::{StateSection, TrainState, TrainerHandle};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from trainer resolution and execution
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("unknown trainer: {0}")]
    Unknown(String),
    #[error("trainer construction failed: {0}")]
    Construct(String),
    #[error("trainer step failed: {0}")]
    Step(String),
}

/// One unit of externally supplied training work.
///
/// `step` advances the state by one iteration; the runner owns the loop,
/// the heartbeat, and checkpoint publication.
pub trait Trainer: Send + Sync {
    fn step(&self, state: &mut TrainState) -> Result<(), TrainerError>;
}

type TrainerFactory =
    Arc<dyn Fn(&TrainerHandle) -> Result<Box<dyn Trainer>, TrainerError> + Send + Sync>;

/// Registry keyed by `<module>:<class>`.
#[derive(Clone, Default)]
pub struct TrainerRegistry {
    factories: HashMap<String, TrainerFactory>,
}

impl TrainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in trainers registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("herd.trainers:Counter", |handle| {
            Ok(Box::new(CounterTrainer::from_handle(handle)?))
        });
        registry
    }

    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&TrainerHandle) -> Result<Box<dyn Trainer>, TrainerError> + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Arc::new(factory));
    }

    pub fn build(&self, handle: &TrainerHandle) -> Result<Box<dyn Trainer>, TrainerError> {
        let key = handle.key();
        let factory = self
            .factories
            .get(&key)
            .ok_or(TrainerError::Unknown(key))?;
        factory(handle)
    }
}

/// Built-in trainer that counts steps. Used by smoke runs and tests; a
/// `fail_at_step` config entry makes it raise at that step.
pub struct CounterTrainer {
    fail_at_step: Option<u64>,
}

impl CounterTrainer {
    pub fn new() -> Self {
        Self { fail_at_step: None }
    }

    pub fn from_handle(handle: &TrainerHandle) -> Result<Self, TrainerError> {
        let fail_at_step = match handle.config.get("fail_at_step") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| TrainerError::Construct(format!("bad fail_at_step: {raw}")))?,
            ),
            None => None,
        };
        Ok(Self { fail_at_step })
    }
}

impl Default for CounterTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Trainer for CounterTrainer {
    fn step(&self, state: &mut TrainState) -> Result<(), TrainerError> {
        if Some(state.step) == self.fail_at_step {
            return Err(TrainerError::Step(format!(
                "injected failure at step {}",
                state.step
            )));
        }
        state.step += 1;
        state.model = StateSection::Bytes(state.step.to_le_bytes().to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[path = "trainer_tests.rs"]
mod tests;
