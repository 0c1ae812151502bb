// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-blocking handle for a streaming remote command.

use tokio::sync::{mpsc, oneshot};

/// Exit code reported when the producer side vanished without a verdict.
pub(crate) const EXIT_UNKNOWN: i32 = -1;

/// Handle to a remote command running in stream mode.
///
/// Lines arrive on unbounded channels fed by a background reader task (or
/// a test fake); `try_next_*` and `exit_code` never block, which lets the
/// controller tail output on its own schedule.
#[derive(Debug)]
pub struct SshStream {
    stdout_rx: mpsc::UnboundedReceiver<String>,
    stderr_rx: mpsc::UnboundedReceiver<String>,
    exit_rx: oneshot::Receiver<i32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exited: Option<i32>,
}

impl SshStream {
    pub(crate) fn new(
        stdout_rx: mpsc::UnboundedReceiver<String>,
        stderr_rx: mpsc::UnboundedReceiver<String>,
        exit_rx: oneshot::Receiver<i32>,
        kill_tx: Option<oneshot::Sender<()>>,
    ) -> Self {
        Self {
            stdout_rx,
            stderr_rx,
            exit_rx,
            kill_tx,
            exited: None,
        }
    }

    /// Next buffered stdout line, if any.
    pub fn try_next_stdout(&mut self) -> Option<String> {
        self.stdout_rx.try_recv().ok()
    }

    /// Next buffered stderr line, if any.
    pub fn try_next_stderr(&mut self) -> Option<String> {
        self.stderr_rx.try_recv().ok()
    }

    /// Exit code once the remote command finished. Buffered lines may
    /// still be pending after this returns `Some`; drain them first.
    pub fn exit_code(&mut self) -> Option<i32> {
        if let Some(rc) = self.exited {
            return Some(rc);
        }
        match self.exit_rx.try_recv() {
            Ok(rc) => {
                self.exited = Some(rc);
                Some(rc)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.exited = Some(EXIT_UNKNOWN);
                Some(EXIT_UNKNOWN)
            }
        }
    }

    /// Ask the producer to kill the remote command. Idempotent.
    pub fn terminate(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
