// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world fixture for the behavioral specs.

use herd_adapters::FakeDriver;
use herd_core::test_support::spec_fixture;
use herd_core::{layout, FakeClock, JobState};
use herd_engine::{RemoteRunner, Supervisor, TrainerRegistry};
use herd_store::{JobRecord, JobRegistry, MemStore, ObjectStore};
use std::path::Path;
use std::time::Duration;

/// One bucket, one control plane, one local spec tree.
pub struct World {
    pub clock: FakeClock,
    pub store: MemStore<FakeClock>,
    pub driver: FakeDriver,
    pub root: tempfile::TempDir,
}

impl World {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        Self {
            store: MemStore::new(clock.clone()),
            driver: FakeDriver::new(),
            root: tempfile::tempdir().unwrap(),
            clock,
        }
    }

    /// Keep the fake wall clock moving with virtual time so registry
    /// caches and touch throttles expire the way they would in the real
    /// world. Call once per test running under `start_paused`.
    pub fn spawn_clock_ticker(&self) {
        let clock = self.clock.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                clock.advance_secs(1);
            }
        });
    }

    pub fn supervisor(&self) -> Supervisor<MemStore<FakeClock>, FakeDriver, FakeClock> {
        Supervisor::new(
            self.root.path().to_path_buf(),
            self.store.clone(),
            self.driver.clone(),
            self.clock.clone(),
        )
    }

    /// Write a spec blob where the submitter would, return its id.
    pub fn submit(&self, experiment: &str, rank: u32) -> String {
        let spec = spec_fixture(experiment, rank);
        let local = self.root.path().join(experiment.replace('/', "-"));
        let path = layout::job_spec_file(&local, rank);
        std::fs::create_dir_all(path.parent().unwrap_or(Path::new("."))).unwrap();
        std::fs::write(&path, spec.serialize().unwrap()).unwrap();
        spec.id
    }

    /// Node-side runner for an armed attempt directory.
    pub fn runner(&self, job_dir: &str) -> RemoteRunner<MemStore<FakeClock>, FakeClock> {
        RemoteRunner::new(
            self.store.clone(),
            self.clock.clone(),
            TrainerRegistry::with_builtins(),
            job_dir,
        )
    }

    /// Wait until a controller arms an attempt (uploads its work unit)
    /// whose directory is not in `seen`; returns that attempt directory.
    pub async fn wait_for_arming(&self, experiment: &str, seen: &[String]) -> String {
        for _ in 0..240u32 {
            let metas = self.store.list(experiment).await.unwrap();
            let fresh = metas.iter().find(|m| {
                m.path.ends_with(layout::FUNCTION_CALL_FILE)
                    && !seen.iter().any(|s| m.path.starts_with(s.as_str()))
            });
            if let Some(meta) = fresh {
                return layout::experiment_dir_of(&meta.path);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        panic!("no new attempt was armed under {experiment}");
    }

    /// All parsed state records under an experiment directory.
    pub async fn records(&self, experiment: &str) -> Vec<JobRecord> {
        let registry = JobRegistry::new(self.store.clone(), self.clock.clone());
        registry.invalidate();
        registry
            .list_jobs(&[])
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.path.starts_with(experiment))
            .collect()
    }

    /// Records under an experiment in the given state.
    pub async fn records_in(&self, experiment: &str, state: JobState) -> Vec<JobRecord> {
        self.records(experiment)
            .await
            .into_iter()
            .filter(|r| r.record.state == state)
            .collect()
    }
}
