// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint selection relies on server-side `updated_at`, never on the
//! numeric step suffix.

use crate::prelude::World;
use herd_core::TrainState;
use herd_store::{JobRegistry, ObjectStore};

#[tokio::test]
async fn latest_checkpoint_is_by_updated_at_not_step_suffix() {
    let world = World::new();

    // Written in this order: 5, 12, then 7. The last write is newest.
    for step in [5u64, 12, 7] {
        let mut state = TrainState::initial();
        state.step = step;
        world
            .store
            .upload(
                &format!("exp/A/trainstate-{step}"),
                &state.serialize().unwrap(),
                true,
            )
            .await
            .unwrap();
    }

    let registry = JobRegistry::new(world.store.clone(), world.clock.clone());
    let latest = registry.latest_trainstate("exp/A").await.unwrap();
    assert_eq!(latest.step, 7);

    let meta = registry.latest_trainstate_meta("exp/A").await.unwrap();
    assert_eq!(meta.path, "exp/A/trainstate-7");
}

#[tokio::test]
async fn overwriting_an_old_step_makes_it_latest_again() {
    let world = World::new();

    for step in [5u64, 12] {
        let mut state = TrainState::initial();
        state.step = step;
        world
            .store
            .upload(
                &format!("exp/A/trainstate-{step}"),
                &state.serialize().unwrap(),
                true,
            )
            .await
            .unwrap();
    }

    // Re-publishing step 5 bumps its updated_at past step 12's.
    let mut state = TrainState::initial();
    state.step = 5;
    world
        .store
        .upload("exp/A/trainstate-5", &state.serialize().unwrap(), true)
        .await
        .unwrap();

    let registry = JobRegistry::new(world.store.clone(), world.clock.clone());
    let meta = registry.latest_trainstate_meta("exp/A").await.unwrap();
    assert_eq!(meta.path, "exp/A/trainstate-5");
}
