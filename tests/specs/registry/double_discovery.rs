// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two supervisors over the same directory both discover the same spec
//! and both arm an attempt. The busy-node derivation keeps the second
//! allocator off the first one's node, and both attempts publish records
//! under distinct attempt directories. This is best-effort by design;
//! the runs converge through trainstate updates.

use crate::prelude::World;
use herd_core::JobState;
use std::collections::HashSet;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn concurrent_supervisors_end_up_on_distinct_nodes() {
    let world = World::new();
    world.spawn_clock_ticker();
    world.submit("exp/A", 0);

    let mut first = world.supervisor();
    first.tick().await.unwrap();
    let first_dir = world.wait_for_arming("exp/A", &[]).await;

    // A second supervisor over the same directory discovers the same
    // spec and arms its own attempt.
    let mut second = world.supervisor();
    second.tick().await.unwrap();
    assert_eq!(first.active(), 1);
    assert_eq!(second.active(), 1);

    let second_dir = world.wait_for_arming("exp/A", &[first_dir.clone()]).await;
    assert_ne!(second_dir, first_dir, "attempt directories are distinct");

    tokio::time::sleep(Duration::from_secs(6)).await;

    // The armed records reference two different nodes: the second pool
    // saw the first node as busy and minted another.
    let records = world.records("exp/A").await;
    assert_eq!(records.len(), 2);
    let nodes: HashSet<String> = records
        .iter()
        .filter(|r| r.record.state.is_active())
        .map(|r| r.record.tpu_name.clone())
        .collect();
    assert_eq!(nodes.len(), 2, "expected two distinct nodes, got {nodes:?}");

    // Neither attempt reached a terminal state yet.
    assert!(world.records_in("exp/A", JobState::Failure).await.is_empty());
}
