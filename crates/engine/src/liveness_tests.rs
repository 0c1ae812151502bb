// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::{FakeClock, JobState, JobStateRecord};
use herd_store::MemStore;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(300);

fn utc(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_observation_is_alive_even_without_heartbeat() {
    let mut liveness = Liveness::new(TIMEOUT);
    assert!(liveness.observe(None));
}

#[tokio::test(start_paused = true)]
async fn missing_heartbeat_dies_after_timeout() {
    let mut liveness = Liveness::new(TIMEOUT);
    assert!(liveness.observe(None));

    tokio::time::advance(TIMEOUT - Duration::from_secs(1)).await;
    assert!(liveness.observe(None));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!liveness.observe(None));
}

#[tokio::test(start_paused = true)]
async fn advancing_heartbeat_keeps_the_job_alive() {
    let mut liveness = Liveness::new(TIMEOUT);
    assert!(liveness.observe(Some(utc(1_000))));

    tokio::time::advance(TIMEOUT - Duration::from_secs(1)).await;
    assert!(liveness.observe(Some(utc(2_000))));

    // A fresh window opened at the advance.
    tokio::time::advance(TIMEOUT - Duration::from_secs(1)).await;
    assert!(liveness.observe(Some(utc(2_000))));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!liveness.observe(Some(utc(2_000))));
}

#[tokio::test(start_paused = true)]
async fn stalled_heartbeat_dies_after_timeout() {
    let mut liveness = Liveness::new(TIMEOUT);
    assert!(liveness.observe(Some(utc(1_000))));

    tokio::time::advance(TIMEOUT + Duration::from_secs(1)).await;
    assert!(!liveness.observe(Some(utc(1_000))));
}

async fn put_record(store: &MemStore<FakeClock>, state: JobState) {
    let yaml = JobStateRecord::with_node(state, "p-0").to_yaml().unwrap();
    store
        .upload("exp/A/j1/jobstate.yml", yaml.as_bytes(), true)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn armed_jobs_are_alive_without_heartbeat() {
    let store = MemStore::new(FakeClock::new());
    put_record(&store, JobState::Armed).await;

    let mut liveness = Liveness::new(TIMEOUT);
    assert!(observe_alive(&store, "exp/A", "j1", &mut liveness)
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn terminal_jobs_are_dead() {
    let store = MemStore::new(FakeClock::new());
    for state in [JobState::Success, JobState::Failure, JobState::Preempted] {
        put_record(&store, state).await;
        let mut liveness = Liveness::new(TIMEOUT);
        assert!(!observe_alive(&store, "exp/A", "j1", &mut liveness)
            .await
            .unwrap());
    }
}

#[tokio::test(start_paused = true)]
async fn running_job_without_heartbeat_gets_the_grace_window() {
    let store = MemStore::new(FakeClock::new());
    put_record(&store, JobState::Running).await;

    let mut liveness = Liveness::new(TIMEOUT);
    assert!(observe_alive(&store, "exp/A", "j1", &mut liveness)
        .await
        .unwrap());

    tokio::time::advance(TIMEOUT + Duration::from_secs(1)).await;
    assert!(!observe_alive(&store, "exp/A", "j1", &mut liveness)
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn missing_record_reads_as_alive() {
    let store = MemStore::new(FakeClock::new());
    let mut liveness = Liveness::new(TIMEOUT);
    assert!(observe_alive(&store, "exp/A", "j1", &mut liveness)
        .await
        .unwrap());
}
