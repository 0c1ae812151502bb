// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived view over the object store: who is running what, where.
//!
//! The registry owns no state beyond a short-lived scan cache; everything
//! it reports is recomputed from `jobstate.yml` records and checkpoint
//! metadata on demand.

use crate::object_store::{BlobMeta, ObjectStore, StoreError};
use chrono::{DateTime, Utc};
use herd_core::layout;
use herd_core::{Clock, FunctionCall, JobState, JobStateRecord, TrainState};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How long a registry scan stays fresh.
pub const REGISTRY_CACHE_TTL_MS: u64 = 5_000;

/// One parsed `jobstate.yml` with its location and freshness.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Full object path of the record.
    pub path: String,
    /// The attempt directory the record lives in.
    pub job_dir: String,
    pub record: JobStateRecord,
    pub updated_at: DateTime<Utc>,
}

/// Latest checkpoint of one experiment, for the browser command.
#[derive(Debug, Clone)]
pub struct ExperimentEntry {
    pub experiment: String,
    pub step: u64,
    pub path: String,
    pub updated_at: DateTime<Utc>,
}

/// Registry over one bucket.
#[derive(Clone)]
pub struct JobRegistry<S: ObjectStore, C: Clock> {
    store: S,
    clock: C,
    cache: Arc<Mutex<Option<(u64, Vec<JobRecord>)>>>,
}

impl<S: ObjectStore, C: Clock> JobRegistry<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drop the scan cache (used after this process writes a record).
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    async fn scan_jobs(&self) -> Result<Vec<JobRecord>, StoreError> {
        let now = self.clock.epoch_ms();
        if let Some((at, records)) = self.cache.lock().as_ref() {
            if now.saturating_sub(*at) < REGISTRY_CACHE_TTL_MS {
                return Ok(records.clone());
            }
        }

        let mut records = Vec::new();
        for meta in self.store.list("").await? {
            if !meta.path.ends_with(layout::JOBSTATE_FILE) {
                continue;
            }
            let body = match self.store.download(&meta.path).await {
                Ok(body) => body,
                Err(StoreError::NotFound(_)) => continue, // raced a cleanup
                Err(e) => return Err(e),
            };
            let text = String::from_utf8_lossy(&body);
            match JobStateRecord::from_yaml(&text) {
                Ok(record) => records.push(JobRecord {
                    job_dir: layout::experiment_dir_of(&meta.path),
                    path: meta.path,
                    record,
                    updated_at: meta.updated_at,
                }),
                Err(e) => {
                    tracing::warn!(path = %meta.path, error = %e, "skipping unparsable jobstate");
                }
            }
        }

        *self.cache.lock() = Some((now, records.clone()));
        Ok(records)
    }

    /// All job records, optionally filtered by state.
    pub async fn list_jobs(&self, filters: &[JobState]) -> Result<Vec<JobRecord>, StoreError> {
        let records = self.scan_jobs().await?;
        if filters.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| filters.contains(&r.record.state))
            .collect())
    }

    /// Names of nodes referenced by an active record. A node in this set
    /// is busy and must not be handed out by the pool.
    pub async fn busy_nodes(&self) -> Result<HashSet<String>, StoreError> {
        let records = self.scan_jobs().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.record.state.is_active() && !r.record.tpu_name.is_empty())
            .map(|r| r.record.tpu_name)
            .collect())
    }

    /// Metadata of the newest checkpoint under an experiment directory.
    ///
    /// Newest by server `updated_at`; ties broken by key name. Client time
    /// plays no part.
    pub async fn latest_trainstate_meta(
        &self,
        experiment_dir: &str,
    ) -> Result<BlobMeta, StoreError> {
        let prefix = layout::trainstate_prefix(experiment_dir);
        let mut metas = self.store.list(&prefix).await?;
        metas.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        metas
            .pop()
            .ok_or_else(|| StoreError::NoCheckpoint(experiment_dir.to_string()))
    }

    /// The canonical resume point for an experiment.
    pub async fn latest_trainstate(&self, experiment_dir: &str) -> Result<TrainState, StoreError> {
        let meta = self.latest_trainstate_meta(experiment_dir).await?;
        let body = self.store.download(&meta.path).await?;
        Ok(TrainState::deserialize(&body)?)
    }

    /// The most recently armed work unit under an experiment directory.
    pub async fn latest_function_call(
        &self,
        experiment_dir: &str,
    ) -> Result<FunctionCall, StoreError> {
        let mut metas: Vec<BlobMeta> = self
            .store
            .list(experiment_dir)
            .await?
            .into_iter()
            .filter(|m| m.path.ends_with(layout::FUNCTION_CALL_FILE))
            .collect();
        metas.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        let meta = metas
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("{}/…/function_call.pkl", experiment_dir)))?;
        let body = self.store.download(&meta.path).await?;
        Ok(FunctionCall::deserialize(&body)?)
    }

    /// Latest checkpoint per experiment directory, bucket-wide.
    pub async fn list_experiments(&self) -> Result<Vec<ExperimentEntry>, StoreError> {
        let mut latest: HashMap<String, ExperimentEntry> = HashMap::new();
        for meta in self.store.list("").await? {
            let Some((dir, file)) = meta.path.rsplit_once('/') else {
                continue;
            };
            let Some(step_text) = file.strip_prefix("trainstate-") else {
                continue;
            };
            let Ok(step) = step_text.parse::<u64>() else {
                continue;
            };
            let entry = ExperimentEntry {
                experiment: dir.to_string(),
                step,
                path: meta.path.clone(),
                updated_at: meta.updated_at,
            };
            match latest.get(dir) {
                Some(existing) if existing.step >= step => {}
                _ => {
                    latest.insert(dir.to_string(), entry);
                }
            }
        }
        let mut entries: Vec<ExperimentEntry> = latest.into_values().collect();
        entries.sort_by(|a, b| a.experiment.cmp(&b.experiment));
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
