// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor loop.
//!
//! Scans a local directory tree for serialized job specs, keeps one
//! controller task per spec alive, reaps finished or dead controllers,
//! and relaunches anything that has not latched SUCCESS. A controller
//! panic is contained by its task; the loop itself never goes down with
//! a job.

use crate::controller::{clean_up, ControllerError, JobController, SharedAttempt};
use crate::liveness::{observe_alive, Liveness};
use herd_core::{Clock, JobSpec, JobState};
use herd_adapters::NodeDriver;
use herd_store::ObjectStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Pause between supervise iterations.
pub const SUPERVISE_INTERVAL: Duration = Duration::from_secs(5);

/// How long shutdown waits for a controller before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Errors from the supervisor loop
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("bad discovery pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

struct DiscoveredJob {
    spec: JobSpec,
    local_dir: PathBuf,
}

struct Child {
    handle: JoinHandle<Result<JobState, ControllerError>>,
    shared: SharedAttempt,
    liveness: Liveness,
    experiment_dir: String,
}

/// Keeps every discovered job's controller alive until SUCCESS.
pub struct Supervisor<S: ObjectStore, D: NodeDriver, C: Clock> {
    root: PathBuf,
    store: S,
    driver: D,
    clock: C,
    jobs: HashMap<String, DiscoveredJob>,
    children: HashMap<String, Child>,
    last_state: HashMap<String, JobState>,
    child_shutdown: watch::Sender<bool>,
}

impl<S: ObjectStore, D: NodeDriver, C: Clock> Supervisor<S, D, C> {
    pub fn new(root: PathBuf, store: S, driver: D, clock: C) -> Self {
        let (child_shutdown, _) = watch::channel(false);
        Self {
            root,
            store,
            driver,
            clock,
            jobs: HashMap::new(),
            children: HashMap::new(),
            last_state: HashMap::new(),
            child_shutdown,
        }
    }

    /// Number of currently tracked controller tasks.
    pub fn active(&self) -> usize {
        self.children.len()
    }

    /// Terminal state of a spec's most recent reaped attempt.
    pub fn last_state_of(&self, spec_id: &str) -> Option<JobState> {
        self.last_state.get(spec_id).copied()
    }

    /// Run until `shutdown` flips true, then fail active attempts and
    /// return cleanly.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), SupervisorError> {
        tracing::info!(root = %self.root.display(), "supervisor started");
        loop {
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }
            self.tick().await?;
            tokio::select! {
                _ = tokio::time::sleep(SUPERVISE_INTERVAL) => {}
                _ = shutdown.changed() => {}
            }
        }
        self.shutdown().await;
        tracing::info!("supervisor stopped");
        Ok(())
    }

    /// One supervise iteration: discover, reap, launch.
    pub async fn tick(&mut self) -> Result<(), SupervisorError> {
        self.discover()?;
        self.reap().await;
        self.launch();
        Ok(())
    }

    /// Pick up any spec blobs that appeared under `<root>/*/Logs/*.pkl`.
    fn discover(&mut self) -> Result<(), SupervisorError> {
        let pattern = format!("{}/*/Logs/*.pkl", self.root.display());
        for entry in glob::glob(&pattern)? {
            let Ok(path) = entry else { continue };
            let Ok(bytes) = std::fs::read(&path) else { continue };
            let spec = match JobSpec::deserialize(&bytes) {
                Ok(spec) => spec,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable spec");
                    continue;
                }
            };
            if self.jobs.contains_key(&spec.id) {
                continue;
            }
            let local_dir = path
                .parent()
                .and_then(|logs| logs.parent())
                .map(PathBuf::from)
                .unwrap_or_else(|| self.root.clone());
            tracing::info!(id = %spec.id, name = %spec.name, rank = spec.rank, "discovered job");
            self.jobs.insert(spec.id.clone(), DiscoveredJob { spec, local_dir });
        }
        Ok(())
    }

    /// Remove finished controllers, and abort ones whose job died under
    /// them (missed heartbeat with the task still wedged).
    async fn reap(&mut self) {
        let ids: Vec<String> = self.children.keys().cloned().collect();
        for id in ids {
            let finished = self
                .children
                .get(&id)
                .map(|c| c.handle.is_finished())
                .unwrap_or(false);

            if finished {
                let Some(child) = self.children.remove(&id) else {
                    continue;
                };
                let state = match child.handle.await {
                    Ok(Ok(state)) => state,
                    Ok(Err(e)) => {
                        tracing::error!(id = %id, error = %e, "controller errored");
                        self.clean_up_child(&child.shared, &child.experiment_dir).await;
                        JobState::Failure
                    }
                    Err(join_err) => {
                        tracing::error!(id = %id, error = %join_err, "controller task died");
                        self.clean_up_child(&child.shared, &child.experiment_dir).await;
                        JobState::Failure
                    }
                };
                tracing::info!(id = %id, state = %state, "reaped controller");
                self.last_state.insert(id, state);
                continue;
            }

            // Liveness: a wedged controller (stalled SSH) must not keep a
            // dead job tracked forever.
            let (job_id, experiment_dir) = match self.children.get(&id) {
                Some(child) => (
                    child.shared.lock().job_id.clone(),
                    child.experiment_dir.clone(),
                ),
                None => continue,
            };
            let Some(job_id) = job_id else { continue };

            let alive = match self.children.get_mut(&id) {
                Some(child) => observe_alive(
                    &self.store,
                    &experiment_dir,
                    job_id.as_str(),
                    &mut child.liveness,
                )
                .await
                .unwrap_or(true),
                None => true,
            };

            if !alive {
                tracing::warn!(id = %id, "job is not alive, aborting its controller");
                if let Some(child) = self.children.remove(&id) {
                    child.handle.abort();
                    self.clean_up_child(&child.shared, &experiment_dir).await;
                }
                self.last_state.insert(id, JobState::Failure);
            }
        }
    }

    async fn clean_up_child(&self, shared: &SharedAttempt, experiment_dir: &str) {
        let (job_id, node) = {
            let info = shared.lock();
            (info.job_id.clone(), info.node.clone().unwrap_or_default())
        };
        let Some(job_id) = job_id else { return };
        if let Err(e) = clean_up(&self.store, experiment_dir, job_id.as_str(), &node).await {
            tracing::error!(job_id = %job_id, error = %e, "clean up failed");
        }
    }

    /// Spawn a controller for every discovered job that is not currently
    /// tracked and has not latched SUCCESS.
    fn launch(&mut self) {
        let to_launch: Vec<String> = self
            .jobs
            .keys()
            .filter(|id| !self.children.contains_key(*id))
            .filter(|id| self.last_state.get(*id) != Some(&JobState::Success))
            .cloned()
            .collect();

        for id in to_launch {
            let Some(job) = self.jobs.get(&id) else { continue };
            let controller = JobController::new(
                job.spec.clone(),
                self.store.clone(),
                self.driver.clone(),
                self.clock.clone(),
                job.local_dir.clone(),
            );
            let liveness = Liveness::new(Duration::from_secs(job.spec.heartbeat_timeout_secs));
            let experiment_dir = job.spec.experiment_directory.clone();
            let shared = SharedAttempt::default();
            tracing::info!(id = %id, job_id = %controller.job_id(), "launching controller");
            let handle = tokio::spawn(controller.launch(shared.clone(), self.child_shutdown.subscribe()));
            self.children.insert(
                id,
                Child {
                    handle,
                    shared,
                    liveness,
                    experiment_dir,
                },
            );
        }
    }

    /// Signal every controller, wait out the grace period, abort
    /// stragglers, and publish FAILURE for anything still active.
    async fn shutdown(&mut self) {
        tracing::info!(active = self.children.len(), "failing active attempts");
        let _ = self.child_shutdown.send(true);

        let children: Vec<(String, Child)> = self.children.drain().collect();
        for (id, mut child) in children {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut child.handle).await {
                Ok(Ok(Ok(state))) => {
                    tracing::info!(id = %id, state = %state, "controller stopped");
                }
                Ok(Ok(Err(e))) => {
                    tracing::error!(id = %id, error = %e, "controller errored during shutdown");
                    self.clean_up_child(&child.shared, &child.experiment_dir).await;
                }
                Ok(Err(join_err)) => {
                    tracing::error!(id = %id, error = %join_err, "controller task died during shutdown");
                    self.clean_up_child(&child.shared, &child.experiment_dir).await;
                }
                Err(_elapsed) => {
                    tracing::warn!(id = %id, "controller did not stop in time, aborting");
                    child.handle.abort();
                    self.clean_up_child(&child.shared, &child.experiment_dir).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
