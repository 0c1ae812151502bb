// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::mem::MemStore;
use herd_core::{FakeClock, JobState, JobStateRecord, TrainState};

fn registry() -> (FakeClock, MemStore<FakeClock>, JobRegistry<MemStore<FakeClock>, FakeClock>) {
    let clock = FakeClock::new();
    let store = MemStore::new(clock.clone());
    let registry = JobRegistry::new(store.clone(), clock.clone());
    (clock, store, registry)
}

async fn put_record(store: &MemStore<FakeClock>, path: &str, state: JobState, node: &str) {
    let yaml = JobStateRecord::with_node(state, node).to_yaml().unwrap();
    store.upload(path, yaml.as_bytes(), true).await.unwrap();
}

#[tokio::test]
async fn list_jobs_parses_and_filters() {
    let (_, store, registry) = registry();
    put_record(&store, "exp/A/j1/jobstate.yml", JobState::Running, "p-0").await;
    put_record(&store, "exp/A/j2/jobstate.yml", JobState::Failure, "p-1").await;
    put_record(&store, "exp/B/j3/jobstate.yml", JobState::Armed, "p-2").await;

    let all = registry.list_jobs(&[]).await.unwrap();
    assert_eq!(all.len(), 3);

    let active = registry
        .list_jobs(&[JobState::Running, JobState::Armed])
        .await
        .unwrap();
    assert_eq!(active.len(), 2);

    let failed = registry.list_jobs(&[JobState::Failure]).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job_dir, "exp/A/j2");
}

#[tokio::test]
async fn unparsable_records_are_skipped() {
    let (_, store, registry) = registry();
    put_record(&store, "exp/A/j1/jobstate.yml", JobState::Running, "p-0").await;
    store
        .upload("exp/A/j2/jobstate.yml", b"{{{not yaml", true)
        .await
        .unwrap();

    let all = registry.list_jobs(&[]).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn busy_nodes_derivation() {
    let (_, store, registry) = registry();
    put_record(&store, "exp/A/j1/jobstate.yml", JobState::Running, "p-0").await;
    put_record(&store, "exp/A/j2/jobstate.yml", JobState::Starting, "p-1").await;
    put_record(&store, "exp/A/j3/jobstate.yml", JobState::Armed, "p-2").await;
    put_record(&store, "exp/A/j4/jobstate.yml", JobState::Failure, "p-3").await;
    put_record(&store, "exp/A/j5/jobstate.yml", JobState::Running, "").await;

    let busy = registry.busy_nodes().await.unwrap();
    assert_eq!(busy.len(), 3);
    assert!(busy.contains("p-0"));
    assert!(busy.contains("p-1"));
    assert!(busy.contains("p-2"));
    assert!(!busy.contains("p-3"));
}

#[tokio::test]
async fn cache_serves_stale_reads_within_ttl() {
    let (clock, store, registry) = registry();
    put_record(&store, "exp/A/j1/jobstate.yml", JobState::Running, "p-0").await;
    assert_eq!(registry.list_jobs(&[]).await.unwrap().len(), 1);

    // A record written after the scan is invisible until the TTL lapses.
    put_record(&store, "exp/A/j2/jobstate.yml", JobState::Running, "p-1").await;
    assert_eq!(registry.list_jobs(&[]).await.unwrap().len(), 1);

    clock.advance_ms(REGISTRY_CACHE_TTL_MS);
    assert_eq!(registry.list_jobs(&[]).await.unwrap().len(), 2);
}

#[tokio::test]
async fn invalidate_forces_a_rescan() {
    let (_, store, registry) = registry();
    put_record(&store, "exp/A/j1/jobstate.yml", JobState::Running, "p-0").await;
    assert_eq!(registry.list_jobs(&[]).await.unwrap().len(), 1);

    put_record(&store, "exp/A/j2/jobstate.yml", JobState::Running, "p-1").await;
    registry.invalidate();
    assert_eq!(registry.list_jobs(&[]).await.unwrap().len(), 2);
}

#[tokio::test]
async fn latest_trainstate_orders_by_updated_at_not_step() {
    let (_, store, registry) = registry();

    for step in [5u64, 12, 7] {
        let mut state = TrainState::initial();
        state.step = step;
        store
            .upload(
                &format!("exp/A/trainstate-{}", step),
                &state.serialize().unwrap(),
                true,
            )
            .await
            .unwrap();
    }

    // trainstate-7 was written last, so it wins despite the lower step.
    let latest = registry.latest_trainstate("exp/A").await.unwrap();
    assert_eq!(latest.step, 7);

    let meta = registry.latest_trainstate_meta("exp/A").await.unwrap();
    assert_eq!(meta.path, "exp/A/trainstate-7");
}

#[tokio::test]
async fn no_checkpoint_is_an_explicit_error() {
    let (_, _, registry) = registry();
    assert!(matches!(
        registry.latest_trainstate("exp/A").await,
        Err(StoreError::NoCheckpoint(_))
    ));
}

#[tokio::test]
async fn latest_function_call_picks_newest_attempt() {
    let (_, store, registry) = registry();

    for (job, step) in [("j1", 1u64), ("j2", 2)] {
        let mut state = TrainState::initial();
        state.step = step;
        let fncall = herd_core::FunctionCall::new(
            herd_core::TrainerHandle::new("m", "C"),
            herd_core::TrainStateRef::Inline(state),
        );
        store
            .upload(
                &format!("exp/A/{}/function_call.pkl", job),
                &fncall.serialize().unwrap(),
                true,
            )
            .await
            .unwrap();
    }

    let latest = registry.latest_function_call("exp/A").await.unwrap();
    match latest.trainstate {
        herd_core::TrainStateRef::Inline(state) => assert_eq!(state.step, 2),
        other => panic!("unexpected ref: {:?}", other),
    }
}

#[tokio::test]
async fn list_experiments_reports_highest_step_per_directory() {
    let (_, store, registry) = registry();
    for (path, body) in [
        ("exp/A/trainstate-5", b"x".as_slice()),
        ("exp/A/trainstate-20", b"x".as_slice()),
        ("exp/B/trainstate-3", b"x".as_slice()),
        ("exp/B/j1/jobstate.yml", b"state: 0\n".as_slice()),
    ] {
        store.upload(path, body, true).await.unwrap();
    }

    let experiments = registry.list_experiments().await.unwrap();
    assert_eq!(experiments.len(), 2);
    assert_eq!(experiments[0].experiment, "exp/A");
    assert_eq!(experiments[0].step, 20);
    assert_eq!(experiments[1].experiment, "exp/B");
    assert_eq!(experiments[1].step, 3);
}
