// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bucket abstraction every subsystem coordinates through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herd_core::CodecError;
use thiserror::Error;

/// Metadata for one stored blob. `updated_at` is the server-side
/// modification time and is the only freshness signal in the system;
/// client clocks are never compared against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub path: String,
    pub updated_at: DateTime<Utc>,
    pub size: u64,
}

/// Errors from object-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no checkpoint under {0}")]
    NoCheckpoint(String),
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("blob codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StoreError {
    /// Transient errors are worth retrying; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Strip a `gs://` scheme and leading/trailing slashes so all callers
/// address blobs by the same relative key.
pub fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix("gs://").unwrap_or(path);
    // After scheme removal the first component may still be a bucket name;
    // callers pass bucket-relative keys, so only slashes are trimmed here.
    path.trim_start_matches('/').trim_end_matches('/').to_string()
}

/// Bucket operations shared by the supervisor and the node-side runner.
#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// List blobs whose path starts with `prefix` (empty prefix lists all).
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError>;

    /// Upload a blob. With `overwrite = false` an existing blob is left
    /// untouched and the call succeeds as a no-op.
    async fn upload(&self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), StoreError>;

    /// Download a blob body.
    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Delete a blob; deleting a missing blob is not an error.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Delete every blob under a prefix.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError>;

    /// Write an empty body to bump `updated_at`. Throttled per path so one
    /// process touches a given path at most once per five seconds.
    async fn touch(&self, path: &str) -> Result<(), StoreError>;

    /// Metadata for one blob, or `None` if it does not exist.
    async fn get_metadata(&self, path: &str) -> Result<Option<BlobMeta>, StoreError>;
}

#[cfg(test)]
#[path = "object_store_tests.rs"]
mod tests;
