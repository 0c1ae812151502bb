// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submit one job against an empty bucket; the supervisor mints a node,
//! the node-side runner trains to the step budget and publishes SUCCESS,
//! and the supervisor latches it.

use crate::prelude::World;
use herd_core::JobState;
use herd_store::ObjectStore;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn single_job_runs_to_success_and_is_not_relaunched() {
    let world = World::new();
    world.spawn_clock_ticker();
    world.driver.push_stream(
        vec!["Starting worker 0".into(), "Finished worker 0".into()],
        vec![],
        0,
    );
    let id = world.submit("exp/A", 0);

    let mut supervisor = world.supervisor();
    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.active(), 1);

    // The controller armed an attempt; play the node side for real.
    let job_dir = world.wait_for_arming("exp/A", &[]).await;
    let outcome = world.runner(&job_dir).run().await.unwrap();
    assert!(!outcome.is_failure());

    // The controller observes the SUCCESS record within a few polls.
    tokio::time::sleep(Duration::from_secs(12)).await;
    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.last_state_of(&id), Some(JobState::Success));
    assert_eq!(supervisor.active(), 0);

    // SUCCESS is latched: further iterations never relaunch.
    tokio::time::sleep(Duration::from_secs(10)).await;
    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.active(), 0);
    assert_eq!(world.records("exp/A").await.len(), 1);

    // The node minted for the empty zone carried the run.
    let success = &world.records_in("exp/A", JobState::Success).await[0];
    assert_eq!(success.record.tpu_name, "polytax-0");

    // The bucket holds checkpoints from the run.
    let checkpoints = world.store.list("exp/A/trainstate").await.unwrap();
    assert!(!checkpoints.is_empty());

    // The collector captured the literal completion line.
    let log_dir = world.root.path().join("exp-A/Logs/job-log.txt");
    let log = std::fs::read_to_string(log_dir).unwrap();
    assert!(log.contains("Finished worker 0"));
}
