// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane and remote-execution adapters

mod gcloud;
mod stream;

pub use gcloud::GcloudDriver;
pub use stream::SshStream;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DriverCall, FakeDriver, SshModeTag};

use async_trait::async_trait;
use herd_core::{CloudParams, Node};
use std::time::Duration;
use thiserror::Error;

/// Errors from node-driver operations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("control plane error (rc {rc}): {stderr}")]
    ControlPlane { rc: i32, stderr: String },
    #[error("ssh produced no result within {}s", .0.as_secs())]
    SshTimeout(Duration),
    #[error("remote command exited with rc {0}")]
    RemoteNonZero(i32),
    #[error("spawn failed: {0}")]
    Spawn(String),
}

impl DriverError {
    /// SSH timeouts are expected during node churn; the controller falls
    /// back to heartbeat-only liveness instead of failing the attempt.
    pub fn is_ssh_timeout(&self) -> bool {
        matches!(self, DriverError::SshTimeout(_))
    }

    /// A create rejected because the name is taken. The pool re-picks a
    /// name instead of backing off.
    pub fn is_name_collision(&self) -> bool {
        match self {
            DriverError::ControlPlane { stderr, .. } => {
                stderr.to_ascii_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}

/// How a remote command's I/O is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshMode {
    /// Wait for exit, return stdout/stderr/rc.
    Capture,
    /// Return a handle with non-blocking stdout/stderr line channels.
    Stream,
    /// Launch and walk away.
    FireAndForget,
}

/// Result of a captured remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOutput {
    pub stdout: String,
    pub stderr: String,
    pub rc: i32,
}

impl SshOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            rc: 0,
        }
    }

    pub fn failed(rc: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            rc,
        }
    }

    /// Convert a non-zero exit into [`DriverError::RemoteNonZero`].
    pub fn require_success(self) -> Result<Self, DriverError> {
        if self.rc == 0 {
            Ok(self)
        } else {
            Err(DriverError::RemoteNonZero(self.rc))
        }
    }
}

/// What an `ssh` call hands back, depending on mode.
#[derive(Debug)]
pub enum SshResult {
    Captured(SshOutput),
    Streaming(SshStream),
    Detached,
}

impl SshResult {
    pub fn into_captured(self) -> Result<SshOutput, DriverError> {
        match self {
            SshResult::Captured(output) => Ok(output),
            _ => Err(DriverError::Spawn("expected captured ssh result".into())),
        }
    }

    pub fn into_stream(self) -> Result<SshStream, DriverError> {
        match self {
            SshResult::Streaming(stream) => Ok(stream),
            _ => Err(DriverError::Spawn("expected streaming ssh result".into())),
        }
    }
}

/// A node creation request.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: String,
    pub cloud: CloudParams,
}

/// Command-level adapter over the cloud provider.
#[async_trait]
pub trait NodeDriver: Clone + Send + Sync + 'static {
    /// Nodes in a zone, with their control-plane status.
    async fn list(&self, zone: &str) -> Result<Vec<Node>, DriverError>;

    /// Create a node. Retries transient control-plane errors internally;
    /// a name collision surfaces immediately so the caller can re-pick.
    async fn create(&self, req: &CreateRequest) -> Result<(), DriverError>;

    /// Delete a node. Always asynchronous on the provider side.
    async fn delete(&self, name: &str, zone: &str) -> Result<(), DriverError>;

    /// Run a command on a node over SSH, with env statements prepended.
    async fn ssh(
        &self,
        name: &str,
        zone: &str,
        cmd: &str,
        env_stmts: &[String],
        mode: SshMode,
        timeout: Option<Duration>,
    ) -> Result<SshResult, DriverError>;

    /// First network endpoint of a node.
    async fn ip_address(&self, name: &str, zone: &str) -> Result<String, DriverError>;
}

/// Prepend env statements to a remote command, original ordering.
pub(crate) fn with_env(cmd: &str, env_stmts: &[String]) -> String {
    let mut full = String::new();
    for stmt in env_stmts {
        full.push_str(stmt);
        if !stmt.trim_end().ends_with(';') {
            full.push(';');
        }
        full.push(' ');
    }
    full.push_str(cmd);
    full
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
