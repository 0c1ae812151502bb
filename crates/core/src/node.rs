// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accelerator node identity and control-plane status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Control-plane status of a node, as reported by the provider list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Ready,
    Creating,
    Preempted,
    Deleting,
    /// Any status string this build does not model.
    Unknown,
}

impl NodeStatus {
    /// Parse a provider status column (e.g. `READY`).
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "READY" => NodeStatus::Ready,
            "CREATING" => NodeStatus::Creating,
            "PREEMPTED" => NodeStatus::Preempted,
            "DELETING" => NodeStatus::Deleting,
            _ => NodeStatus::Unknown,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Ready => "READY",
            NodeStatus::Creating => "CREATING",
            NodeStatus::Preempted => "PREEMPTED",
            NodeStatus::Deleting => "DELETING",
            NodeStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// One accelerator VM, unique by name within a (zone, project).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub zone: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub ip: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, zone: impl Into<String>, status: NodeStatus) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
            status,
            ip: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == NodeStatus::Ready
    }

    /// Numeric suffix of a pool-minted name (`<project>-<n>`), if any.
    pub fn numeric_suffix(name: &str) -> Option<u64> {
        name.rsplit_once('-').and_then(|(_, n)| n.parse().ok())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.name)
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
