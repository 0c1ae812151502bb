// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the CLI.

use anyhow::Result;
use herd_core::layout;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maximum nanny log size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Plain stderr logging for one-shot commands.
pub fn init_stderr() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Supervisor logging: stderr plus a non-blocking appender writing the
/// transcript to `<experiment_dir>/Logs/nanny-log.txt`.
///
/// The returned guard is leaked intentionally; the nanny runs for the
/// process lifetime and the appender must outlive every log call.
pub fn init_nanny(experiment_dir: &Path) -> Result<()> {
    let logs_dir = layout::logs_dir(experiment_dir);
    std::fs::create_dir_all(&logs_dir)?;

    let log_path = layout::nanny_log_file(experiment_dir);
    rotate_log_if_needed(&log_path);

    let file_appender = tracing_appender::rolling::never(&logs_dir, "nanny-log.txt");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();
    Ok(())
}

/// Rotate the nanny log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `nanny-log.txt` through `.1`, `.2`, `.3`, deleting the oldest.
/// Best-effort: rotation failures are silently ignored so the supervisor
/// still starts.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}
