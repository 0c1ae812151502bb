// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gcloud-based node driver for TPU VMs.

use super::stream::SshStream;
use super::{with_env, CreateRequest, DriverError, NodeDriver, SshMode, SshOutput, SshResult};
use crate::subprocess::{
    run_with_timeout, CONTROL_PLANE_TIMEOUT, CREATE_TIMEOUT, SSH_CAPTURE_TIMEOUT,
};
use async_trait::async_trait;
use herd_core::{Node, NodeStatus};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

/// TPU VM software version requested at creation.
const RUNTIME_VERSION: &str = "tpu-vm-pt-1.10";

/// Creation retry schedule: base doubling to a cap, six attempts total.
const CREATE_BACKOFF_BASE: Duration = Duration::from_secs(5);
const CREATE_BACKOFF_CAP: Duration = Duration::from_secs(60);
const CREATE_MAX_ATTEMPTS: u32 = 6;

/// Shutdown script attached to every node. On preemption the provider
/// runs it, SIGTERMing the runner so it can publish PREEMPTED before the
/// VM is torn down.
const SHUTDOWN_SCRIPT: &str = "#! /bin/bash\n\
    pgrep -f 'herd train' | xargs -r kill -SIGTERM\n\
    while pgrep -f 'herd train' > /dev/null; do sleep 1; done\n";

/// Node driver shelling out to `gcloud alpha compute tpus tpu-vm`.
#[derive(Clone, Default)]
pub struct GcloudDriver;

impl GcloudDriver {
    pub fn new() -> Self {
        Self
    }

    fn control_plane_error(output: &std::process::Output) -> DriverError {
        DriverError::ControlPlane {
            rc: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    async fn try_create(&self, req: &CreateRequest) -> Result<(), DriverError> {
        let cloud = &req.cloud;
        let mut cmd = Command::new("gcloud");
        cmd.args([
            "alpha",
            "compute",
            "tpus",
            "tpu-vm",
            "create",
            &req.name,
            "--zone",
            &cloud.zone,
            "--network",
            &cloud.network,
            "--subnetwork",
            &cloud.subnet,
            "--range",
            &cloud.range,
            "--accelerator-type",
            &cloud.acc_type,
            "--version",
            RUNTIME_VERSION,
        ]);
        if cloud.preemptible {
            cmd.arg("--preemptible");
        }
        cmd.arg("--metadata")
            .arg(format!("shutdown-script={}", SHUTDOWN_SCRIPT));

        let output = run_with_timeout(cmd, CREATE_TIMEOUT, "tpu create")
            .await
            .map_err(DriverError::Spawn)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Self::control_plane_error(&output))
        }
    }

    fn ssh_command(name: &str, zone: &str, cmd: &str, env_stmts: &[String]) -> Command {
        let full_cmd = with_env(cmd, env_stmts);
        let mut command = Command::new("gcloud");
        command.args([
            "alpha", "compute", "tpus", "tpu-vm", "ssh", name, "--zone", zone, "--command",
        ]);
        command.arg(full_cmd);
        command
    }

    fn spawn_stream(mut command: Command) -> Result<SshStream, DriverError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| DriverError::Spawn(e.to_string()))?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, mut kill_rx) = oneshot::channel();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        if let Some(stdout) = stdout {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if out_tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if err_tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }

        // Watcher owns the child: forwards the exit code, honors kill requests.
        tokio::spawn(async move {
            let rc = tokio::select! {
                status = child.wait() => status.ok().and_then(|s| s.code()).unwrap_or(-1),
                _ = &mut kill_rx => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    -1
                }
            };
            let _ = exit_tx.send(rc);
        });

        Ok(SshStream::new(out_rx, err_rx, exit_rx, Some(kill_tx)))
    }
}

#[async_trait]
impl NodeDriver for GcloudDriver {
    async fn list(&self, zone: &str) -> Result<Vec<Node>, DriverError> {
        let mut cmd = Command::new("gcloud");
        cmd.args([
            "compute",
            "tpus",
            "list",
            "--format=value(NAME,STATUS)",
            "--zone",
            zone,
        ]);
        let output = run_with_timeout(cmd, CONTROL_PLANE_TIMEOUT, "tpu list")
            .await
            .map_err(DriverError::Spawn)?;
        if !output.status.success() {
            return Err(Self::control_plane_error(&output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut nodes = Vec::new();
        for row in stdout.lines().filter(|r| !r.trim().is_empty()) {
            let mut cols = row.split('\t');
            let name = cols.next().unwrap_or_default().trim();
            let status = cols.next().unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            nodes.push(Node::new(name, zone, NodeStatus::parse(status)));
        }
        Ok(nodes)
    }

    async fn create(&self, req: &CreateRequest) -> Result<(), DriverError> {
        let mut attempt = 1;
        let mut delay = CREATE_BACKOFF_BASE;
        loop {
            match self.try_create(req).await {
                Ok(()) => {
                    tracing::info!(name = %req.name, zone = %req.cloud.zone, "node created");
                    return Ok(());
                }
                Err(e) if e.is_name_collision() => return Err(e),
                Err(e) if attempt < CREATE_MAX_ATTEMPTS => {
                    tracing::warn!(
                        name = %req.name,
                        attempt,
                        delay_s = delay.as_secs(),
                        error = %e,
                        "create failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(CREATE_BACKOFF_CAP);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn delete(&self, name: &str, zone: &str) -> Result<(), DriverError> {
        tracing::info!(name, zone, "deleting node");
        let mut cmd = Command::new("gcloud");
        cmd.args([
            "alpha", "compute", "tpus", "tpu-vm", "delete", name, "--zone", zone, "--async",
            "--quiet",
        ]);
        let output = run_with_timeout(cmd, CONTROL_PLANE_TIMEOUT, "tpu delete")
            .await
            .map_err(DriverError::Spawn)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Self::control_plane_error(&output))
        }
    }

    async fn ssh(
        &self,
        name: &str,
        zone: &str,
        cmd: &str,
        env_stmts: &[String],
        mode: SshMode,
        timeout: Option<Duration>,
    ) -> Result<SshResult, DriverError> {
        let command = Self::ssh_command(name, zone, cmd, env_stmts);
        match mode {
            SshMode::Capture => {
                let limit = timeout.unwrap_or(SSH_CAPTURE_TIMEOUT);
                let output = run_with_timeout(command, limit, "ssh")
                    .await
                    .map_err(|msg| {
                        if msg.contains("timed out") {
                            DriverError::SshTimeout(limit)
                        } else {
                            DriverError::Spawn(msg)
                        }
                    })?;
                Ok(SshResult::Captured(SshOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    rc: output.status.code().unwrap_or(-1),
                }))
            }
            SshMode::Stream => Ok(SshResult::Streaming(Self::spawn_stream(command)?)),
            SshMode::FireAndForget => {
                let mut command = command;
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(false);
                command
                    .spawn()
                    .map_err(|e| DriverError::Spawn(e.to_string()))?;
                Ok(SshResult::Detached)
            }
        }
    }

    async fn ip_address(&self, name: &str, zone: &str) -> Result<String, DriverError> {
        let mut cmd = Command::new("gcloud");
        cmd.args([
            "compute",
            "tpus",
            "describe",
            name,
            "--zone",
            zone,
            "--format=value(networkEndpoints[0].ipAddress)",
        ]);
        let output = run_with_timeout(cmd, CONTROL_PLANE_TIMEOUT, "tpu describe")
            .await
            .map_err(DriverError::Spawn)?;
        if !output.status.success() {
            return Err(Self::control_plane_error(&output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
#[path = "gcloud_tests.rs"]
mod tests;
