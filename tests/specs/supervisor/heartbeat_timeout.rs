// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node goes quiet after RUNNING is published: no heartbeat ever
//! advances, so the controller declares the attempt dead 300s after the
//! last observation and the supervisor relaunches.

use crate::prelude::World;
use herd_core::JobState;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn silent_node_is_failed_after_the_heartbeat_window() {
    let world = World::new();
    world.spawn_clock_ticker();
    let id = world.submit("exp/A", 0);

    let mut supervisor = world.supervisor();
    supervisor.tick().await.unwrap();

    // The controller arms and starts the (fake) train stream, but no
    // node-side runner ever touches the heartbeat.
    world.wait_for_arming("exp/A", &[]).await;
    assert_eq!(world.records_in("exp/A", JobState::Failure).await.len(), 0);

    // Ride out the heartbeat window.
    tokio::time::sleep(Duration::from_secs(310)).await;
    assert_eq!(world.records_in("exp/A", JobState::Failure).await.len(), 1);

    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.last_state_of(&id), Some(JobState::Failure));
    assert_eq!(supervisor.active(), 1, "the spec is relaunched");
}
