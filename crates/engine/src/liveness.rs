// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat-based liveness tracking.

use chrono::{DateTime, Utc};
use herd_core::JobState;
use herd_core::{layout, JobStateRecord};
use herd_store::{ObjectStore, StoreError};
use std::time::Duration;
use tokio::time::Instant;

/// A RUNNING job is dead once the heartbeat's `updated_at` has not
/// advanced for this long. Each JobSpec can override it.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(300);

/// Tracks whether a job's heartbeat keeps advancing.
///
/// Freshness is judged by *change* in the server-side `updated_at`, never
/// by comparing it to the local clock. On the first observation the job
/// gets the full timeout window, even when the blob does not exist yet.
#[derive(Debug)]
pub struct Liveness {
    timeout: Duration,
    last_seen: Option<DateTime<Utc>>,
    last_advance: Option<Instant>,
}

impl Liveness {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_seen: None,
            last_advance: None,
        }
    }

    /// Feed one heartbeat observation; returns whether the job counts as
    /// alive right now.
    pub fn observe(&mut self, heartbeat: Option<DateTime<Utc>>) -> bool {
        let now = Instant::now();
        match self.last_advance {
            None => {
                self.last_seen = heartbeat;
                self.last_advance = Some(now);
                true
            }
            Some(at) => {
                if heartbeat.is_some() && heartbeat != self.last_seen {
                    self.last_seen = heartbeat;
                    self.last_advance = Some(now);
                    true
                } else {
                    now.duration_since(at) < self.timeout
                }
            }
        }
    }
}

/// One observation of a job's aliveness, derived from its state record
/// and heartbeat freshness.
///
/// ARMED (and not-yet-recorded) jobs are alive unconditionally; RUNNING
/// jobs are alive while the heartbeat advances; terminal states are dead.
pub async fn observe_alive<S: ObjectStore>(
    store: &S,
    experiment_dir: &str,
    job_id: &str,
    liveness: &mut Liveness,
) -> Result<bool, StoreError> {
    let record = read_record(store, experiment_dir, job_id).await?;
    match record.map(|r| r.state) {
        None | Some(JobState::Starting) | Some(JobState::Armed) => Ok(true),
        Some(JobState::Running) => {
            let heartbeat = store
                .get_metadata(&layout::heartbeat_path(experiment_dir))
                .await?;
            Ok(liveness.observe(heartbeat.map(|m| m.updated_at)))
        }
        Some(_) => Ok(false),
    }
}

/// Read and parse a job's state record, if present.
pub async fn read_record<S: ObjectStore>(
    store: &S,
    experiment_dir: &str,
    job_id: &str,
) -> Result<Option<JobStateRecord>, StoreError> {
    let path = layout::jobstate_path(experiment_dir, job_id);
    match store.download(&path).await {
        Ok(body) => Ok(Some(JobStateRecord::from_yaml(&String::from_utf8_lossy(
            &body,
        ))?)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
