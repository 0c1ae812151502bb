// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the cloud control plane and remote command execution

pub mod driver;
pub mod subprocess;

pub use driver::{
    CreateRequest, DriverError, GcloudDriver, NodeDriver, SshMode, SshOutput, SshResult, SshStream,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use driver::{DriverCall, FakeDriver, SshModeTag};
