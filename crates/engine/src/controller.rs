// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-spec job controller.
//!
//! One controller owns one run attempt: it claims a node, uploads the
//! work unit, drives setup/install/train over SSH, and watches the
//! attempt's `jobstate.yml` and heartbeat until a terminal state. All
//! truth is published to the object store; the supervisor can reap and
//! relaunch from the record alone.

use crate::collector::LogCollector;
use crate::liveness::{read_record, Liveness};
use crate::pool::{NodePool, PoolError};
use herd_core::layout;
use herd_core::{
    Clock, CodecError, FunctionCall, IdGen, JobId, JobSpec, JobState, JobStateRecord, Node,
    TrainState, TrainStateRef, UuidIdGen,
};
use herd_adapters::{DriverError, NodeDriver, SshMode, SshOutput, SshStream};
use herd_store::{JobRegistry, ObjectStore, StoreError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Stream tail poll period.
pub const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Record/liveness checks run every this many stream polls.
const RECORD_CHECK_TICKS: u64 = 5;

/// Errors from controller operations
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the supervisor knows about a controller it spawned, kept outside
/// the task so the attempt can be cleaned up even if the task dies.
#[derive(Debug, Default)]
pub struct AttemptInfo {
    pub job_id: Option<JobId>,
    pub node: Option<String>,
    pub terminal: Option<JobState>,
}

pub type SharedAttempt = Arc<Mutex<AttemptInfo>>;

/// Publish FAILURE for an attempt whose controller is gone (reaped after
/// a panic, a hang, or supervisor shutdown).
pub async fn clean_up<S: ObjectStore>(
    store: &S,
    experiment_dir: &str,
    job_id: &str,
    node: &str,
) -> Result<(), StoreError> {
    let record = JobStateRecord::with_node(JobState::Failure, node);
    let path = layout::jobstate_path(experiment_dir, job_id);
    store
        .upload(&path, record.to_yaml()?.as_bytes(), true)
        .await
}

/// Drives one run attempt of one [`JobSpec`].
pub struct JobController<S: ObjectStore, D: NodeDriver, C: Clock> {
    spec: JobSpec,
    job_id: JobId,
    store: S,
    driver: D,
    registry: JobRegistry<S, C>,
    local_dir: PathBuf,
    liveness: Liveness,
}

impl<S: ObjectStore, D: NodeDriver, C: Clock> JobController<S, D, C> {
    pub fn new(spec: JobSpec, store: S, driver: D, clock: C, local_dir: PathBuf) -> Self {
        let liveness = Liveness::new(Duration::from_secs(spec.heartbeat_timeout_secs));
        Self {
            job_id: JobId::new(UuidIdGen.next()),
            registry: JobRegistry::new(store.clone(), clock),
            spec,
            store,
            driver,
            local_dir,
            liveness,
        }
    }

    /// Pin the attempt id (tests).
    pub fn with_job_id(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = job_id.into();
        self
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Run the attempt to a terminal state. The returned state has already
    /// been published to (or observed in) `jobstate.yml`.
    pub async fn launch(
        mut self,
        shared: SharedAttempt,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JobState, ControllerError> {
        shared.lock().job_id = Some(self.job_id.clone());
        let outcome = self.drive(&shared, shutdown).await;
        match &outcome {
            Ok(state) => {
                shared.lock().terminal = Some(*state);
                tracing::info!(job_id = %self.job_id, state = %state, "attempt finished");
            }
            Err(e) => {
                tracing::error!(job_id = %self.job_id, error = %e, "attempt errored");
            }
        }
        outcome
    }

    async fn write_state(&self, state: JobState, node: &str) -> Result<(), ControllerError> {
        let record = JobStateRecord::with_node(state, node);
        let path = layout::jobstate_path(&self.spec.experiment_directory, self.job_id.as_str());
        self.store
            .upload(&path, record.to_yaml()?.as_bytes(), true)
            .await?;
        self.registry.invalidate();
        tracing::info!(job_id = %self.job_id, state = %state, node, "state transition");
        Ok(())
    }

    async fn fail(&self, node: &str) -> Result<JobState, ControllerError> {
        self.write_state(JobState::Failure, node).await?;
        Ok(JobState::Failure)
    }

    async fn drive(
        &mut self,
        shared: &SharedAttempt,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JobState, ControllerError> {
        self.write_state(JobState::Starting, "").await?;

        // ARM: claim (or mint) a node. A create reject is terminal for
        // this attempt; the supervisor relaunches with a fresh allocation.
        let mut pool = NodePool::new(
            self.driver.clone(),
            self.registry.clone(),
            self.spec.cloud.clone(),
        );
        let node = match pool.acquire(1).await {
            Ok(mut nodes) => match nodes.pop() {
                Some(node) => node,
                None => return self.fail("").await,
            },
            Err(e) => {
                tracing::error!(error = %e, "node acquisition failed");
                return self.fail("").await;
            }
        };
        shared.lock().node = Some(node.name.clone());
        self.write_state(JobState::Armed, &node.name).await?;

        // Resume from the newest checkpoint when one exists.
        let trainstate = match self
            .registry
            .latest_trainstate_meta(&self.spec.experiment_directory)
            .await
        {
            Ok(meta) => {
                tracing::info!(checkpoint = %meta.path, "resuming from checkpoint");
                TrainStateRef::Path(meta.path)
            }
            Err(StoreError::NoCheckpoint(_)) => TrainStateRef::Inline(TrainState::initial()),
            Err(e) => return Err(e.into()),
        };

        let mut fncall =
            FunctionCall::new(self.spec.trainer.clone(), trainstate).with_node(&node.name);
        fncall.kwargs.insert(
            "num_train_steps".to_string(),
            self.spec.num_train_steps.to_string(),
        );
        fncall.kwargs.insert(
            "checkpoint_interval".to_string(),
            self.spec.checkpoint_interval.to_string(),
        );
        fncall
            .kwargs
            .insert("nprocs".to_string(), self.spec.nprocs.to_string());
        fncall
            .kwargs
            .insert("rank".to_string(), self.spec.rank.to_string());

        let fncall_path =
            layout::function_call_path(&self.spec.experiment_directory, self.job_id.as_str());
        self.store
            .upload(&fncall_path, &fncall.serialize()?, false)
            .await?;

        if !self.run_setup(&node).await? {
            return self.fail(&node.name).await;
        }

        self.write_state(JobState::Running, &node.name).await?;

        let job_dir = layout::job_dir(&self.spec.experiment_directory, self.job_id.as_str());
        let train_cmd = format!("{} {} {}", self.spec.train_cmd, self.spec.cloud.bucket, job_dir);
        let stream = match self
            .driver
            .ssh(
                &node.name,
                &node.zone,
                &train_cmd,
                &self.spec.env_stmts,
                SshMode::Stream,
                None,
            )
            .await
            .and_then(|r| r.into_stream())
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "train launch failed");
                return self.fail(&node.name).await;
            }
        };

        self.monitor(stream, &node, shutdown).await
    }

    async fn capture(&self, node: &Node, cmd: &str) -> Result<SshOutput, DriverError> {
        self.driver
            .ssh(
                &node.name,
                &node.zone,
                cmd,
                &self.spec.env_stmts,
                SshMode::Capture,
                Some(Duration::from_secs(self.spec.ssh_timeout_secs)),
            )
            .await?
            .into_captured()
    }

    /// Run the setup commands; any nonzero rc triggers the single install
    /// attempt. Returns false when the attempt must fail. SSH timeouts are
    /// not fatal here; liveness falls back to the heartbeat.
    async fn run_setup(&self, node: &Node) -> Result<bool, ControllerError> {
        let mut install_attempted = false;
        for cmd in &self.spec.setup_cmds {
            let output = match self.capture(node, cmd).await {
                Ok(output) => output,
                Err(e) if e.is_ssh_timeout() => {
                    tracing::warn!(cmd = %cmd, "setup ssh timed out, continuing");
                    continue;
                }
                Err(e) => {
                    tracing::error!(cmd = %cmd, error = %e, "setup ssh failed");
                    return Ok(false);
                }
            };

            if output.rc == 0 {
                continue;
            }
            if install_attempted {
                tracing::error!(cmd = %cmd, rc = output.rc, "setup failed after install");
                return Ok(false);
            }

            install_attempted = true;
            tracing::info!(cmd = %cmd, rc = output.rc, "setup failed, attempting install");
            let install = match self.capture(node, &self.spec.install_cmd).await {
                Ok(output) => output,
                Err(e) if e.is_ssh_timeout() => {
                    tracing::warn!("install ssh timed out, continuing");
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "install ssh failed");
                    return Ok(false);
                }
            };
            if install.rc != 0 {
                tracing::error!(rc = install.rc, "install failed");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Tail the remote stream and watch the record until terminal.
    async fn monitor(
        &mut self,
        mut stream: SshStream,
        node: &Node,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<JobState, ControllerError> {
        let collector = LogCollector::new(
            &self.local_dir,
            &self.spec.name,
            &node.name,
            self.spec.rank,
        )?;
        let experiment_dir = self.spec.experiment_directory.clone();
        let mut ticks: u64 = 0;
        let mut remote_rc: Option<i32> = None;

        loop {
            // A closed channel means the supervisor is gone; treat it the
            // same as an explicit shutdown.
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                tracing::info!(job_id = %self.job_id, "shutdown requested, failing attempt");
                stream.terminate();
                return self.fail(&node.name).await;
            }

            drain(&mut stream, &collector);

            if remote_rc.is_none() {
                if let Some(rc) = stream.exit_code() {
                    drain(&mut stream, &collector);
                    remote_rc = Some(rc);
                    tracing::info!(rc, "remote train command exited");
                    if rc != 0 {
                        // Nonzero exit with no terminal record is a failure.
                        let state =
                            read_record(&self.store, &experiment_dir, self.job_id.as_str())
                                .await?
                                .map(|r| r.state);
                        return match state {
                            Some(s) if s.is_terminal() => Ok(s),
                            _ => self.fail(&node.name).await,
                        };
                    }
                }
            }

            if ticks % RECORD_CHECK_TICKS == 0 {
                let state = read_record(&self.store, &experiment_dir, self.job_id.as_str())
                    .await?
                    .map(|r| r.state);
                match state {
                    Some(s) if s.is_terminal() => {
                        tracing::info!(state = %s, "terminal state observed");
                        stream.terminate();
                        return Ok(s);
                    }
                    Some(JobState::Running) | None => {
                        // A RUNNING node that vanished from the control
                        // plane was preempted.
                        if let Ok(listed) = self.driver.list(&node.zone).await {
                            if !listed.iter().any(|n| n.name == node.name) {
                                tracing::warn!(node = %node.name, "node disappeared");
                                self.write_state(JobState::Preempted, &node.name).await?;
                                return Ok(JobState::Preempted);
                            }
                        }

                        let heartbeat = self
                            .store
                            .get_metadata(&layout::heartbeat_path(&experiment_dir))
                            .await?;
                        if !self.liveness.observe(heartbeat.map(|m| m.updated_at)) {
                            tracing::warn!(job_id = %self.job_id, "heartbeat timed out");
                            stream.terminate();
                            return self.fail(&node.name).await;
                        }
                    }
                    _ => {}
                }
            }

            ticks += 1;
            tokio::select! {
                _ = tokio::time::sleep(STREAM_POLL_INTERVAL) => {}
                _ = shutdown.changed() => {}
            }
        }
    }
}

fn drain(stream: &mut SshStream, collector: &LogCollector) {
    while let Some(line) = stream.try_next_stdout() {
        if let Err(e) = collector.stdout_line(&line) {
            tracing::warn!(error = %e, "dropping stdout line");
        }
    }
    while let Some(line) = stream.try_next_stderr() {
        if let Err(e) = collector.stderr_line(&line) {
            tracing::warn!(error = %e, "dropping stderr line");
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
