// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Setup returns rc=1, triggering the single install attempt; install
//! returns rc=2, so the attempt fails without ever invoking the train
//! command, and the supervisor relaunches.

use crate::prelude::World;
use herd_adapters::{DriverCall, SshModeTag, SshOutput};
use herd_core::JobState;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn install_failure_fails_the_attempt_without_training() {
    let world = World::new();
    world.spawn_clock_ticker();
    world.driver.push_ssh_result(SshOutput::failed(1, ""));
    world
        .driver
        .push_ssh_result(SshOutput::failed(2, "ENOSPC: no space left"));
    let id = world.submit("exp/A", 0);

    let mut supervisor = world.supervisor();
    supervisor.tick().await.unwrap();

    // The attempt fails fast; give the controller task a beat to finish.
    tokio::time::sleep(Duration::from_secs(6)).await;

    // The failed attempt never ran the train command (no stream ssh).
    let streams = world
        .driver
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DriverCall::Ssh { mode, .. } if *mode == SshModeTag::Stream))
        .count();
    assert_eq!(streams, 0);
    assert_eq!(world.records_in("exp/A", JobState::Failure).await.len(), 1);

    // No success condition was met, so the next iteration relaunches.
    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.last_state_of(&id), Some(JobState::Failure));
    assert_eq!(supervisor.active(), 1);
}
