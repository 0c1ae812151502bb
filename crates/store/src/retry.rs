// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capped exponential backoff for transient provider errors.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff policy: base 5s doubling to a 60s cap, six attempts total.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(60),
            max_attempts: 6,
        }
    }
}

impl Backoff {
    /// Delay before the given retry (attempt is 1-based; the first retry
    /// waits roughly `base`). Jittered by up to one extra second.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let capped = exp.min(self.cap);
        let jitter_ms = rand::rng().random_range(0..1000);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Run `op` until it succeeds, the error stops being transient, or the
/// attempt budget is exhausted. The last error is surfaced to the caller.
pub async fn retry_transient<T, E, F, Fut, P>(
    policy: Backoff,
    what: &str,
    is_transient: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
