// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-side runner.
//!
//! Hydrates the serialized work unit, resolves the resume point, and
//! drives the trainer with `nprocs` cooperative workers. Worker 0 is the
//! canonical writer: it touches the heartbeat, publishes checkpoints, and
//! writes the terminal SUCCESS record. Progress lines go to stdout, which
//! the supervisor-side controller is tailing over SSH.

use crate::trainer::{Trainer, TrainerError, TrainerRegistry};
use herd_core::layout;
use herd_core::{
    codec, Clock, CodecError, FunctionCall, JobOutcome, JobState, JobStateRecord, TrainState,
    TrainStateRef,
};
use herd_store::{JobRegistry, ObjectStore, StoreError};
use thiserror::Error;

/// Workers spawned per node, one per accelerator core.
pub const DEFAULT_NPROCS: u32 = 8;

/// Errors from the node-side runner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("trainer error: {0}")]
    Trainer(#[from] TrainerError),
}

/// Executes one hydrated work unit on the node.
#[derive(Clone)]
pub struct RemoteRunner<S: ObjectStore, C: Clock> {
    store: S,
    registry: JobRegistry<S, C>,
    trainers: TrainerRegistry,
    job_dir: String,
    experiment_dir: String,
}

impl<S: ObjectStore, C: Clock> RemoteRunner<S, C> {
    pub fn new(store: S, clock: C, trainers: TrainerRegistry, job_dir: impl Into<String>) -> Self {
        let job_dir = job_dir.into();
        let experiment_dir = layout::experiment_dir_of(&job_dir);
        Self {
            registry: JobRegistry::new(store.clone(), clock),
            store,
            trainers,
            job_dir,
            experiment_dir,
        }
    }

    /// Run the work unit to completion. The returned outcome is also
    /// serialized to `function_output.pkl`; SUCCESS is published from
    /// here, while failures surface through the process exit code.
    pub async fn run(&self) -> Result<JobOutcome, RunnerError> {
        let blob = self
            .store
            .download(&layout::function_call_path_in(&self.job_dir))
            .await?;
        let mut fncall = FunctionCall::deserialize(&blob)?;

        let state = self.resolve_trainstate(&fncall).await?;
        tracing::info!(step = state.step, "hydrated train state");

        let budget = kwarg(&fncall, "num_train_steps", 0u64);
        let checkpoint_interval = kwarg(&fncall, "checkpoint_interval", 100u64).max(1);
        let nprocs = kwarg(&fncall, "nprocs", DEFAULT_NPROCS).max(1);

        // Secondary workers run their own trainer instance over a copy of
        // the state; only worker 0 writes anything durable.
        let mut secondaries = Vec::new();
        for rank in 1..nprocs {
            let runner = self.clone();
            let trainer = self.trainers.build(&fncall.trainer)?;
            let state = state.clone();
            secondaries.push(tokio::spawn(async move {
                runner
                    .train_loop(rank, trainer, state, budget, checkpoint_interval)
                    .await
            }));
        }

        let trainer = self.trainers.build(&fncall.trainer)?;
        let outcome = match self
            .train_loop(0, trainer, state, budget, checkpoint_interval)
            .await
        {
            Ok(final_state) => {
                self.publish_state(JobState::Success, &fncall.tpu_name)
                    .await?;
                JobOutcome::Value(codec::encode(&final_state)?)
            }
            Err(RunnerError::Trainer(e)) => {
                tracing::error!(error = %e, "trainer raised");
                JobOutcome::Exception(e.to_string())
            }
            Err(e) => return Err(e),
        };

        for handle in secondaries {
            if let Ok(Err(e)) = handle.await {
                tracing::warn!(error = %e, "secondary worker errored");
            }
        }

        fncall.outputs = outcome.clone();
        self.store
            .upload(
                &layout::function_output_path_in(&self.job_dir),
                &fncall.serialize_outputs()?,
                true,
            )
            .await?;
        Ok(outcome)
    }

    /// SIGTERM path: the provider is tearing the node down.
    pub async fn publish_preempted(&self) -> Result<(), RunnerError> {
        println!("Job is exiting gracefully");
        self.publish_state(JobState::Preempted, "").await
    }

    async fn publish_state(&self, state: JobState, tpu_name: &str) -> Result<(), RunnerError> {
        let record = JobStateRecord::with_node(state, tpu_name);
        self.store
            .upload(
                &layout::jobstate_path_in(&self.job_dir),
                record.to_yaml()?.as_bytes(),
                true,
            )
            .await?;
        Ok(())
    }

    /// Prefer the newest checkpoint in the experiment directory; fall
    /// back to whatever the work unit carries.
    async fn resolve_trainstate(&self, fncall: &FunctionCall) -> Result<TrainState, RunnerError> {
        match self.registry.latest_trainstate(&self.experiment_dir).await {
            Ok(state) => Ok(state),
            Err(StoreError::NoCheckpoint(_)) => match &fncall.trainstate {
                TrainStateRef::Inline(state) => Ok(state.clone()),
                TrainStateRef::Path(path) => {
                    let blob = self.store.download(path).await?;
                    Ok(TrainState::deserialize(&blob)?)
                }
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn train_loop(
        &self,
        rank: u32,
        trainer: Box<dyn Trainer>,
        mut state: TrainState,
        budget: u64,
        checkpoint_interval: u64,
    ) -> Result<TrainState, RunnerError> {
        println!("Starting worker {}", rank);
        while state.step < budget {
            trainer.step(&mut state)?;

            if rank == 0 {
                self.store
                    .touch(&layout::heartbeat_path(&self.experiment_dir))
                    .await?;
                if state.step % checkpoint_interval == 0 || state.step >= budget {
                    self.store
                        .upload(
                            &layout::trainstate_path(&self.experiment_dir, state.step),
                            &state.serialize()?,
                            true,
                        )
                        .await?;
                }
            }

            tokio::task::yield_now().await;
        }
        println!("Finished worker {}", rank);
        Ok(state)
    }
}

fn kwarg<T: std::str::FromStr + Copy>(fncall: &FunctionCall, key: &str, default: T) -> T {
    fncall
        .kwargs
        .get(key)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
