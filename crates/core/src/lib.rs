// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd-core: Data model for the herd accelerator-job supervisor

pub mod clock;
pub mod codec;
pub mod fncall;
pub mod id;
pub mod layout;
pub mod node;
pub mod spec;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod trainstate;

pub use clock::{Clock, SystemClock};
pub use codec::{decode, encode, CodecError};
pub use fncall::{FunctionCall, JobOutcome, TrainStateRef, TrainerHandle};
pub use id::{IdGen, JobId, SequentialIdGen, ShortId, UuidIdGen};
pub use node::{Node, NodeStatus};
pub use spec::{CloudParams, JobSpec};
pub use state::{JobState, JobStateRecord};
pub use trainstate::{StateSection, TrainState};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
