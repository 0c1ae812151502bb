// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preemption mid-run: the node-side SIGTERM handler publishes PREEMPTED;
//! the supervisor reaps and re-arms, and the second attempt resumes from
//! the newest checkpoint.

use crate::prelude::World;
use herd_core::{layout, FunctionCall, JobState, TrainState, TrainStateRef};
use herd_store::ObjectStore;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn preempted_job_is_rearmed_from_the_latest_checkpoint() {
    let world = World::new();
    world.spawn_clock_ticker();
    let id = world.submit("exp/A", 0);

    let mut supervisor = world.supervisor();
    supervisor.tick().await.unwrap();

    // First attempt arms; the node trains partway, checkpoints at step 5,
    // then the provider SIGTERMs the runner.
    let first_dir = world.wait_for_arming("exp/A", &[]).await;
    let mut partial = TrainState::initial();
    partial.step = 5;
    world
        .store
        .upload("exp/A/trainstate-5", &partial.serialize().unwrap(), true)
        .await
        .unwrap();
    world.runner(&first_dir).publish_preempted().await.unwrap();

    // The controller observes PREEMPTED; the supervisor reaps and
    // relaunches on a following iteration.
    tokio::time::sleep(Duration::from_secs(12)).await;
    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.last_state_of(&id), Some(JobState::Preempted));
    assert_eq!(supervisor.active(), 1, "spec was re-armed");

    // The second attempt's work unit references the checkpoint, not a
    // fresh seed state.
    let second_dir = world.wait_for_arming("exp/A", &[first_dir.clone()]).await;
    assert_ne!(second_dir, first_dir, "re-arm uses a fresh attempt dir");
    let blob = world
        .store
        .download(&layout::function_call_path_in(&second_dir))
        .await
        .unwrap();
    let fncall = FunctionCall::deserialize(&blob).unwrap();
    assert_eq!(
        fncall.trainstate,
        TrainStateRef::Path("exp/A/trainstate-5".to_string())
    );

    // Node side finishes the remaining steps and succeeds.
    let outcome = world.runner(&second_dir).run().await.unwrap();
    assert!(!outcome.is_failure());

    tokio::time::sleep(Duration::from_secs(12)).await;
    supervisor.tick().await.unwrap();
    assert_eq!(supervisor.last_state_of(&id), Some(JobState::Success));

    // Prior attempt artifacts are retained for debugging.
    assert_eq!(world.records("exp/A").await.len(), 2);
    assert_eq!(world.records_in("exp/A", JobState::Preempted).await.len(), 1);
    assert_eq!(world.records_in("exp/A", JobState::Success).await.len(), 1);
}
