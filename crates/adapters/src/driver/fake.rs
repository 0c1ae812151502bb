// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable node driver for tests.

use super::stream::SshStream;
use super::{with_env, CreateRequest, DriverError, NodeDriver, SshMode, SshOutput, SshResult};
use async_trait::async_trait;
use herd_core::{Node, NodeStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One recorded driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    List { zone: String },
    Create { name: String, zone: String },
    Delete { name: String, zone: String },
    Ssh { name: String, cmd: String, mode: SshModeTag },
    IpAddress { name: String },
}

/// Copyable tag for recorded ssh modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshModeTag {
    Capture,
    Stream,
    FireAndForget,
}

impl From<SshMode> for SshModeTag {
    fn from(mode: SshMode) -> Self {
        match mode {
            SshMode::Capture => SshModeTag::Capture,
            SshMode::Stream => SshModeTag::Stream,
            SshMode::FireAndForget => SshModeTag::FireAndForget,
        }
    }
}

struct StreamScript {
    stdout: Vec<String>,
    stderr: Vec<String>,
    rc: i32,
}

struct State {
    nodes: Vec<Node>,
    calls: Vec<DriverCall>,
    ssh_results: VecDeque<SshOutput>,
    streams: VecDeque<StreamScript>,
    create_errors: VecDeque<String>,
    create_status: NodeStatus,
}

impl Default for State {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            calls: Vec::new(),
            ssh_results: VecDeque::new(),
            streams: VecDeque::new(),
            create_errors: VecDeque::new(),
            create_status: NodeStatus::Ready,
        }
    }
}

/// In-memory control plane. Created nodes appear in subsequent lists with
/// a configurable status; ssh results and streams are scripted FIFO.
#[derive(Clone, Default)]
pub struct FakeDriver {
    inner: Arc<Mutex<State>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, name: &str, zone: &str, status: NodeStatus) {
        self.inner
            .lock()
            .nodes
            .push(Node::new(name, zone, status));
    }

    /// Drop a node from the control plane, as a preemption does.
    pub fn remove_node(&self, name: &str) {
        self.inner.lock().nodes.retain(|n| n.name != name);
    }

    /// Status newly created nodes report (default READY; use CREATING to
    /// model control-plane lag).
    pub fn set_create_status(&self, status: NodeStatus) {
        self.inner.lock().create_status = status;
    }

    /// Fail the next create with this stderr.
    pub fn push_create_error(&self, stderr: impl Into<String>) {
        self.inner.lock().create_errors.push_back(stderr.into());
    }

    /// Script the next capture-mode ssh result.
    pub fn push_ssh_result(&self, output: SshOutput) {
        self.inner.lock().ssh_results.push_back(output);
    }

    /// Script the next stream-mode ssh session.
    pub fn push_stream(&self, stdout: Vec<String>, stderr: Vec<String>, rc: i32) {
        self.inner.lock().streams.push_back(StreamScript {
            stdout,
            stderr,
            rc,
        });
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }

    pub fn node_names(&self, zone: &str) -> Vec<String> {
        self.inner
            .lock()
            .nodes
            .iter()
            .filter(|n| n.zone == zone)
            .map(|n| n.name.clone())
            .collect()
    }

    fn build_stream(script: StreamScript) -> SshStream {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        for line in script.stdout {
            let _ = out_tx.send(line);
        }
        for line in script.stderr {
            let _ = err_tx.send(line);
        }
        let _ = exit_tx.send(script.rc);

        SshStream::new(out_rx, err_rx, exit_rx, None)
    }
}

#[async_trait]
impl NodeDriver for FakeDriver {
    async fn list(&self, zone: &str) -> Result<Vec<Node>, DriverError> {
        let mut state = self.inner.lock();
        state.calls.push(DriverCall::List {
            zone: zone.to_string(),
        });
        Ok(state
            .nodes
            .iter()
            .filter(|n| n.zone == zone)
            .cloned()
            .collect())
    }

    async fn create(&self, req: &CreateRequest) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        state.calls.push(DriverCall::Create {
            name: req.name.clone(),
            zone: req.cloud.zone.clone(),
        });

        if let Some(stderr) = state.create_errors.pop_front() {
            return Err(DriverError::ControlPlane { rc: 1, stderr });
        }
        if state.nodes.iter().any(|n| n.name == req.name) {
            return Err(DriverError::ControlPlane {
                rc: 1,
                stderr: format!("resource '{}' already exists", req.name),
            });
        }

        let status = state.create_status;
        state
            .nodes
            .push(Node::new(&req.name, &req.cloud.zone, status));
        Ok(())
    }

    async fn delete(&self, name: &str, zone: &str) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        state.calls.push(DriverCall::Delete {
            name: name.to_string(),
            zone: zone.to_string(),
        });
        state.nodes.retain(|n| n.name != name);
        Ok(())
    }

    async fn ssh(
        &self,
        name: &str,
        _zone: &str,
        cmd: &str,
        env_stmts: &[String],
        mode: SshMode,
        _timeout: Option<Duration>,
    ) -> Result<SshResult, DriverError> {
        let mut state = self.inner.lock();
        state.calls.push(DriverCall::Ssh {
            name: name.to_string(),
            cmd: with_env(cmd, env_stmts),
            mode: mode.into(),
        });

        match mode {
            SshMode::Capture => {
                let output = state
                    .ssh_results
                    .pop_front()
                    .unwrap_or_else(|| SshOutput::ok(""));
                Ok(SshResult::Captured(output))
            }
            SshMode::Stream => {
                let script = state.streams.pop_front().unwrap_or(StreamScript {
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    rc: 0,
                });
                Ok(SshResult::Streaming(Self::build_stream(script)))
            }
            SshMode::FireAndForget => Ok(SshResult::Detached),
        }
    }

    async fn ip_address(&self, name: &str, _zone: &str) -> Result<String, DriverError> {
        let mut state = self.inner.lock();
        state.calls.push(DriverCall::IpAddress {
            name: name.to_string(),
        });
        Ok("10.0.0.2".to_string())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
