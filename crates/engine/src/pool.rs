// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node inventory and allocation for one (zone, project) pair.

use herd_adapters::{CreateRequest, DriverError, NodeDriver};
use herd_core::{CloudParams, Clock, Node, NodeStatus};
use herd_store::{JobRegistry, ObjectStore, StoreError};
use std::collections::HashSet;
use thiserror::Error;

/// How many fresh names to try when creates collide with a concurrent
/// allocator before giving up.
pub const NAME_RETRY_LIMIT: u32 = 3;

/// Errors from node allocation
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
    #[error("registry error: {0}")]
    Store(#[from] StoreError),
    #[error("no free node name after {0} attempts")]
    NamesExhausted(u32),
}

/// Inventory of accelerator nodes in one zone.
///
/// `available = ready − busy − pending` where busy comes from the job
/// registry and `pending` papers over control-plane lag: names this
/// process created that have not yet shown up in a list call.
pub struct NodePool<S: ObjectStore, D: NodeDriver, C: Clock> {
    driver: D,
    registry: JobRegistry<S, C>,
    cloud: CloudParams,
    pending: HashSet<String>,
}

impl<S: ObjectStore, D: NodeDriver, C: Clock> NodePool<S, D, C> {
    pub fn new(driver: D, registry: JobRegistry<S, C>, cloud: CloudParams) -> Self {
        Self {
            driver,
            registry,
            cloud,
            pending: HashSet::new(),
        }
    }

    /// Allocate `n` nodes. Free READY nodes are handed out first; the
    /// remainder are freshly created and returned not-ready. The caller
    /// owns the returned nodes until its attempt reaches a terminal state.
    pub async fn acquire(&mut self, n: usize) -> Result<Vec<Node>, PoolError> {
        let listed = self.driver.list(&self.cloud.zone).await?;
        // A pending name that the control plane now reports is no longer
        // our bookkeeping problem.
        self.pending
            .retain(|name| !listed.iter().any(|node| &node.name == name));

        let busy = self.registry.busy_nodes().await?;
        let mut available: Vec<&Node> = listed
            .iter()
            .filter(|node| node.is_ready())
            .filter(|node| !busy.contains(&node.name) && !self.pending.contains(&node.name))
            .collect();

        let mut acquired = Vec::with_capacity(n);
        for _ in 0..n {
            match available.pop() {
                Some(node) => {
                    tracing::info!(name = %node.name, "using existing node");
                    acquired.push(node.clone());
                }
                None => {
                    let node = self.mint(&listed, &acquired).await?;
                    acquired.push(node);
                }
            }
        }
        Ok(acquired)
    }

    /// Create a fresh node under a new name. Collisions with concurrent
    /// allocators surface as control-plane rejects; re-pick and retry.
    async fn mint(&mut self, listed: &[Node], acquired: &[Node]) -> Result<Node, PoolError> {
        let mut taken: HashSet<String> = listed.iter().map(|n| n.name.clone()).collect();
        taken.extend(self.pending.iter().cloned());
        taken.extend(acquired.iter().map(|n| n.name.clone()));

        for _ in 0..NAME_RETRY_LIMIT {
            let name = self.next_name(&taken);
            let req = CreateRequest {
                name: name.clone(),
                cloud: self.cloud.clone(),
            };
            tracing::info!(name = %name, zone = %self.cloud.zone, "creating new node");
            match self.driver.create(&req).await {
                Ok(()) => {
                    self.pending.insert(name.clone());
                    return Ok(Node::new(name, &self.cloud.zone, NodeStatus::Creating));
                }
                Err(e) if e.is_name_collision() => {
                    tracing::warn!(name = %name, "name collided, re-picking");
                    taken.insert(name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PoolError::NamesExhausted(NAME_RETRY_LIMIT))
    }

    /// `<project>-<max numeric suffix + 1>` over every name we know about.
    fn next_name(&self, taken: &HashSet<String>) -> String {
        let next = taken
            .iter()
            .filter_map(|name| Node::numeric_suffix(name))
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        format!("{}-{}", self.cloud.project, next)
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
