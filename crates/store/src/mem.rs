// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory object store for tests.

use crate::object_store::{normalize_path, BlobMeta, ObjectStore, StoreError};
use crate::touch::TouchGate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herd_core::Clock;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    updated_ms: u64,
}

/// Clock-driven in-memory bucket. Write times come from the injected
/// clock but are kept strictly monotone so checkpoint-ordering tests are
/// deterministic even when the fake clock stands still.
#[derive(Clone)]
pub struct MemStore<C: Clock> {
    clock: C,
    gate: TouchGate<C>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    blobs: BTreeMap<String, StoredBlob>,
    last_write_ms: u64,
}

impl<C: Clock> MemStore<C> {
    pub fn new(clock: C) -> Self {
        Self {
            gate: TouchGate::new(clock.clone()),
            clock,
            inner: Arc::new(Mutex::new(Inner {
                blobs: BTreeMap::new(),
                last_write_ms: 0,
            })),
        }
    }

    fn write(&self, path: &str, bytes: Vec<u8>) {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms().max(inner.last_write_ms + 1);
        inner.last_write_ms = now;
        inner.blobs.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                updated_ms: now,
            },
        );
    }

    fn meta(path: &str, blob: &StoredBlob) -> BlobMeta {
        BlobMeta {
            path: path.to_string(),
            updated_at: DateTime::<Utc>::from_timestamp_millis(blob.updated_ms as i64)
                .unwrap_or_default(),
            size: blob.bytes.len() as u64,
        }
    }

    /// Test hook: pin a blob's updated time.
    pub fn set_updated_ms(&self, path: &str, ms: u64) {
        let path = normalize_path(path);
        let mut inner = self.inner.lock();
        if let Some(blob) = inner.blobs.get_mut(&path) {
            blob.updated_ms = ms;
        }
    }

    /// Test hook: a blob's updated time, if present.
    pub fn updated_ms(&self, path: &str) -> Option<u64> {
        let path = normalize_path(path);
        self.inner.lock().blobs.get(&path).map(|b| b.updated_ms)
    }

    /// Test hook: number of stored blobs.
    pub fn len(&self) -> usize {
        self.inner.lock().blobs.len()
    }

    /// Test hook: true when the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().blobs.is_empty()
    }
}

#[async_trait]
impl<C: Clock> ObjectStore for MemStore<C> {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError> {
        let prefix = normalize_path(prefix);
        let inner = self.inner.lock();
        Ok(inner
            .blobs
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, blob)| Self::meta(path, blob))
            .collect())
    }

    async fn upload(&self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), StoreError> {
        let path = normalize_path(path);
        if !overwrite && self.inner.lock().blobs.contains_key(&path) {
            tracing::debug!(path = %path, "already exists, skipping upload");
            return Ok(());
        }
        self.write(&path, bytes.to_vec());
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let path = normalize_path(path);
        self.inner
            .lock()
            .blobs
            .get(&path)
            .map(|b| b.bytes.clone())
            .ok_or(StoreError::NotFound(path))
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let path = normalize_path(path);
        Ok(self.inner.lock().blobs.contains_key(&path))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = normalize_path(path);
        self.inner.lock().blobs.remove(&path);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        let prefix = normalize_path(prefix);
        let mut inner = self.inner.lock();
        inner.blobs.retain(|path, _| !path.starts_with(&prefix));
        Ok(())
    }

    async fn touch(&self, path: &str) -> Result<(), StoreError> {
        let path = normalize_path(path);
        if !self.gate.permit(&path) {
            return Ok(());
        }
        self.write(&path, Vec::new());
        Ok(())
    }

    async fn get_metadata(&self, path: &str) -> Result<Option<BlobMeta>, StoreError> {
        let path = normalize_path(path);
        Ok(self
            .inner
            .lock()
            .blobs
            .get(&path)
            .map(|blob| Self::meta(&path, blob)))
    }
}

#[cfg(test)]
#[path = "mem_tests.rs"]
mod tests;
