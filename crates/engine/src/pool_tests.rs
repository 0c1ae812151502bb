// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::test_support::cloud_fixture;
use herd_core::{FakeClock, JobState, JobStateRecord};
use herd_adapters::{DriverCall, FakeDriver};
use herd_store::MemStore;

struct Fixture {
    clock: FakeClock,
    store: MemStore<FakeClock>,
    driver: FakeDriver,
    pool: NodePool<MemStore<FakeClock>, FakeDriver, FakeClock>,
}

fn fixture() -> Fixture {
    let clock = FakeClock::new();
    let store = MemStore::new(clock.clone());
    let driver = FakeDriver::new();
    let registry = JobRegistry::new(store.clone(), clock.clone());
    let pool = NodePool::new(driver.clone(), registry, cloud_fixture());
    Fixture {
        clock,
        store,
        driver,
        pool,
    }
}

async fn mark_busy(store: &MemStore<FakeClock>, job: &str, node: &str) {
    let yaml = JobStateRecord::with_node(JobState::Running, node)
        .to_yaml()
        .unwrap();
    store
        .upload(&format!("exp/A/{}/jobstate.yml", job), yaml.as_bytes(), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn acquire_prefers_a_free_ready_node() {
    let mut f = fixture();
    f.driver
        .add_node("polytax-0", "us-central1-f", NodeStatus::Ready);

    let nodes = f.pool.acquire(1).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "polytax-0");
    assert!(nodes[0].is_ready());
    assert!(!f
        .driver
        .calls()
        .iter()
        .any(|c| matches!(c, DriverCall::Create { .. })));
}

#[tokio::test]
async fn acquire_with_empty_zone_creates_exactly_one_not_ready_node() {
    let mut f = fixture();
    f.driver.set_create_status(NodeStatus::Creating);

    let nodes = f.pool.acquire(1).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "polytax-0");
    assert!(!nodes[0].is_ready());

    let creates: Vec<_> = f
        .driver
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DriverCall::Create { .. }))
        .collect();
    assert_eq!(creates.len(), 1);
}

#[tokio::test]
async fn busy_nodes_are_not_handed_out() {
    let mut f = fixture();
    f.driver
        .add_node("polytax-0", "us-central1-f", NodeStatus::Ready);
    mark_busy(&f.store, "j1", "polytax-0").await;

    let nodes = f.pool.acquire(1).await.unwrap();
    // polytax-0 is busy, so a fresh polytax-1 is minted.
    assert_eq!(nodes[0].name, "polytax-1");
}

#[tokio::test]
async fn not_ready_nodes_are_not_handed_out() {
    let mut f = fixture();
    f.driver
        .add_node("polytax-0", "us-central1-f", NodeStatus::Preempted);

    let nodes = f.pool.acquire(1).await.unwrap();
    assert_eq!(nodes[0].name, "polytax-1");
}

#[tokio::test]
async fn names_grow_past_the_max_existing_suffix() {
    let mut f = fixture();
    f.driver
        .add_node("polytax-4", "us-central1-f", NodeStatus::Preempted);

    let nodes = f.pool.acquire(1).await.unwrap();
    assert_eq!(nodes[0].name, "polytax-5");
}

#[tokio::test]
async fn pending_names_are_skipped_until_visible() {
    let mut f = fixture();
    // Model control-plane lag by acquiring twice in a row: the second
    // acquire must not reuse the name the first one created while it is
    // still coming up and has no registry record yet.
    f.driver.set_create_status(NodeStatus::Creating);

    let first = f.pool.acquire(1).await.unwrap();
    assert_eq!(first[0].name, "polytax-0");

    // polytax-0 is now listed as CREATING (not ready), so the next
    // acquire mints polytax-1.
    let second = f.pool.acquire(1).await.unwrap();
    assert_eq!(second[0].name, "polytax-1");
}

#[tokio::test]
async fn collision_re_picks_a_name() {
    let mut f = fixture();
    // A concurrent allocator owns polytax-0 but it is not yet listed.
    f.driver.push_create_error("resource 'polytax-0' already exists");

    let nodes = f.pool.acquire(1).await.unwrap();
    assert_eq!(nodes.len(), 1);
    // First pick collided; second pick succeeded under a fresh name.
    let creates: Vec<_> = f
        .driver
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DriverCall::Create { .. }))
        .collect();
    assert_eq!(creates.len(), 2);
}

#[tokio::test]
async fn non_collision_create_failure_surfaces() {
    let mut f = fixture();
    f.driver.push_create_error("quota exceeded");

    assert!(matches!(
        f.pool.acquire(1).await,
        Err(PoolError::Driver(_))
    ));
}

#[tokio::test]
async fn acquire_two_mixes_existing_and_minted() {
    let mut f = fixture();
    f.driver
        .add_node("polytax-0", "us-central1-f", NodeStatus::Ready);

    let nodes = f.pool.acquire(2).await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].name, "polytax-0");
    assert_eq!(nodes[1].name, "polytax-1");
}
