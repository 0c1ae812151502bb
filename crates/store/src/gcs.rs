// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GCS-backed object store, driven through the `gcloud storage` CLI.

use crate::object_store::{normalize_path, BlobMeta, ObjectStore, StoreError};
use crate::retry::{retry_transient, Backoff};
use crate::touch::TouchGate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herd_core::SystemClock;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Hard ceiling on any single storage command.
pub const STORE_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Bucket adapter shelling out to `gcloud storage`.
///
/// Every operation is wrapped in the transient-retry policy; callers see
/// `Transient` only after the backoff budget is exhausted.
#[derive(Clone)]
pub struct GcsStore {
    bucket: String,
    gate: TouchGate<SystemClock>,
    backoff: Backoff,
}

impl GcsStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            gate: TouchGate::new(SystemClock),
            backoff: Backoff::default(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url(&self, path: &str) -> String {
        format!("gs://{}/{}", self.bucket, normalize_path(path))
    }

    fn relative(&self, url: &str) -> String {
        let stripped = url
            .strip_prefix(&format!("gs://{}/", self.bucket))
            .unwrap_or(url);
        stripped.to_string()
    }

    /// Distinguish a missing object from everything else. Anything that is
    /// not clearly "no such object" is treated as transient and retried.
    fn classify(context: &str, stderr: &str) -> StoreError {
        let lowered = stderr.to_ascii_lowercase();
        if lowered.contains("matched no objects")
            || lowered.contains("no urls matched")
            || lowered.contains("notfound")
            || lowered.contains("404")
        {
            StoreError::NotFound(context.to_string())
        } else {
            StoreError::Transient(format!("{}: {}", context, stderr.trim()))
        }
    }

    async fn run(args: &[String], stdin: Option<&[u8]>) -> Result<std::process::Output, StoreError> {
        let mut cmd = Command::new("gcloud");
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| StoreError::Transient(format!("gcloud spawn failed: {}", e)))?;

        if let Some(bytes) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(bytes)
                    .await
                    .map_err(|e| StoreError::Transient(format!("stdin write failed: {}", e)))?;
            }
        }

        match tokio::time::timeout(STORE_COMMAND_TIMEOUT, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(StoreError::Transient(format!("gcloud failed: {}", e))),
            Err(_) => Err(StoreError::Transient(format!(
                "gcloud timed out after {}s",
                STORE_COMMAND_TIMEOUT.as_secs()
            ))),
        }
    }

    /// Parse one entry of `gcloud storage ls --json` output.
    fn parse_entry(&self, entry: &serde_json::Value) -> Option<BlobMeta> {
        let url = entry.get("url")?.as_str()?;
        if entry.get("type").and_then(|t| t.as_str()) == Some("prefix") {
            return None;
        }
        let metadata = entry.get("metadata")?;
        let updated_at = metadata
            .get("updated")
            .and_then(|u| u.as_str())
            .and_then(|u| DateTime::parse_from_rfc3339(u).ok())
            .map(|u| u.with_timezone(&Utc))
            .unwrap_or_default();
        let size = metadata
            .get("size")
            .map(|s| {
                s.as_u64()
                    .or_else(|| s.as_str().and_then(|s| s.parse().ok()))
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        Some(BlobMeta {
            path: self.relative(url),
            updated_at,
            size,
        })
    }

    async fn list_url(&self, url: String) -> Result<Vec<BlobMeta>, StoreError> {
        let args = vec![
            "storage".to_string(),
            "ls".to_string(),
            "--json".to_string(),
            url.clone(),
        ];
        let output = Self::run(&args, None).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return match Self::classify(&url, &stderr) {
                StoreError::NotFound(_) => Ok(Vec::new()),
                other => Err(other),
            };
        }

        let entries: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)
            .map_err(|e| StoreError::Transient(format!("unparsable ls output: {}", e)))?;
        Ok(entries
            .iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect())
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError> {
        let url = format!("{}**", self.url(prefix));
        retry_transient(self.backoff, "list", StoreError::is_transient, || {
            self.list_url(url.clone())
        })
        .await
    }

    async fn upload(&self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), StoreError> {
        if !overwrite && self.exists(path).await? {
            tracing::debug!(path = %path, "already exists, skipping upload");
            return Ok(());
        }

        let url = self.url(path);
        tracing::debug!(url = %url, size = bytes.len(), "uploading");
        let args = vec![
            "storage".to_string(),
            "cp".to_string(),
            "-".to_string(),
            url.clone(),
        ];
        retry_transient(self.backoff, "upload", StoreError::is_transient, || {
            let args = args.clone();
            let url = url.clone();
            async move {
                let output = Self::run(&args, Some(bytes)).await?;
                if output.status.success() {
                    Ok(())
                } else {
                    Err(StoreError::Transient(format!(
                        "upload {}: {}",
                        url,
                        String::from_utf8_lossy(&output.stderr).trim()
                    )))
                }
            }
        })
        .await
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.url(path);
        let args = vec!["storage".to_string(), "cat".to_string(), url.clone()];
        retry_transient(self.backoff, "download", StoreError::is_transient, || {
            let args = args.clone();
            let url = url.clone();
            async move {
                let output = Self::run(&args, None).await?;
                if output.status.success() {
                    Ok(output.stdout)
                } else {
                    Err(Self::classify(
                        &url,
                        &String::from_utf8_lossy(&output.stderr),
                    ))
                }
            }
        })
        .await
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.get_metadata(path).await?.is_some())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let url = self.url(path);
        let args = vec!["storage".to_string(), "rm".to_string(), url.clone()];
        let output = Self::run(&args, None).await?;
        if output.status.success() {
            return Ok(());
        }
        match Self::classify(&url, &String::from_utf8_lossy(&output.stderr)) {
            // Deleting a missing blob is not an error.
            StoreError::NotFound(_) => Ok(()),
            other => Err(other),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        let url = format!("{}**", self.url(prefix));
        let args = vec!["storage".to_string(), "rm".to_string(), url.clone()];
        let output = Self::run(&args, None).await?;
        if output.status.success() {
            return Ok(());
        }
        match Self::classify(&url, &String::from_utf8_lossy(&output.stderr)) {
            StoreError::NotFound(_) => Ok(()),
            other => Err(other),
        }
    }

    async fn touch(&self, path: &str) -> Result<(), StoreError> {
        if !self.gate.permit(&normalize_path(path)) {
            return Ok(());
        }
        self.upload(path, &[], true).await
    }

    async fn get_metadata(&self, path: &str) -> Result<Option<BlobMeta>, StoreError> {
        let normalized = normalize_path(path);
        let url = self.url(path);
        let metas = retry_transient(self.backoff, "metadata", StoreError::is_transient, || {
            self.list_url(url.clone())
        })
        .await?;
        Ok(metas.into_iter().find(|m| m.path == normalized))
    }
}

#[cfg(test)]
#[path = "gcs_tests.rs"]
mod tests;
