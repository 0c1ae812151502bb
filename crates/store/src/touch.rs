// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat write backpressure.

use herd_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimum interval between touches of the same path from one process.
pub const TOUCH_INTERVAL_MS: u64 = 5_000;

/// Per-path throttle gate shared by store implementations.
///
/// The node-side runner touches the heartbeat on every iteration; without
/// this gate a fast trainer would hammer the bucket with metadata writes.
#[derive(Clone)]
pub struct TouchGate<C: Clock> {
    clock: C,
    last: Arc<Mutex<HashMap<String, u64>>>,
}

impl<C: Clock> TouchGate<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns true (and records the touch) if enough time has passed
    /// since this path was last touched.
    pub fn permit(&self, path: &str) -> bool {
        let now = self.clock.epoch_ms();
        let mut last = self.last.lock();
        match last.get(path) {
            Some(&at) if now.saturating_sub(at) < TOUCH_INTERVAL_MS => false,
            _ => {
                last.insert(path.to_string(), now);
                true
            }
        }
    }
}

#[cfg(test)]
#[path = "touch_tests.rs"]
mod tests;
