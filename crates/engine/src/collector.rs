// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote output collector.
//!
//! Remote stdout/stderr lines from every attempt of an experiment are
//! multiplexed into two append-only files under the local `Logs/`
//! directory, tagged with the job name, node, wall clock, and rank.

use chrono::{DateTime, Utc};
use herd_core::layout;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends tagged remote output to the experiment's local log files.
pub struct LogCollector {
    log_path: PathBuf,
    err_path: PathBuf,
    name: String,
    node: String,
    rank: u32,
}

impl LogCollector {
    pub fn new(
        local_experiment_dir: &Path,
        name: impl Into<String>,
        node: impl Into<String>,
        rank: u32,
    ) -> io::Result<Self> {
        let logs = layout::logs_dir(local_experiment_dir);
        std::fs::create_dir_all(&logs)?;
        Ok(Self {
            log_path: layout::job_log_file(local_experiment_dir),
            err_path: layout::job_err_file(local_experiment_dir),
            name: name.into(),
            node: node.into(),
            rank,
        })
    }

    fn tag(&self, line: &str) -> String {
        let clock: DateTime<Utc> = Utc::now();
        format!(
            "[{} {} {} rank={}] {}\n",
            self.name,
            self.node,
            clock.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.rank,
            line
        )
    }

    fn append(path: &Path, entry: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(entry.as_bytes())
    }

    pub fn stdout_line(&self, line: &str) -> io::Result<()> {
        Self::append(&self.log_path, &self.tag(line))
    }

    pub fn stderr_line(&self, line: &str) -> io::Result<()> {
        Self::append(&self.err_path, &self.tag(line))
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
