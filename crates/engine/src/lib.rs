// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd-engine: the supervisor loop and its supporting machinery
//!
//! A [`supervisor::Supervisor`] discovers job specs on the local
//! filesystem and keeps one [`controller::JobController`] task per spec
//! alive across preemptions and failures. Controllers place work through
//! the [`pool::NodePool`] and observe it through the object store; the
//! node side of the protocol lives in [`runner::RemoteRunner`].

pub mod collector;
pub mod controller;
pub mod liveness;
pub mod pool;
pub mod runner;
pub mod supervisor;
pub mod trainer;

pub use collector::LogCollector;
pub use controller::{AttemptInfo, ControllerError, JobController, SharedAttempt};
pub use liveness::Liveness;
pub use pool::{NodePool, PoolError};
pub use runner::{RemoteRunner, RunnerError};
pub use supervisor::{Supervisor, SupervisorError, SUPERVISE_INTERVAL};
pub use trainer::{CounterTrainer, Trainer, TrainerError, TrainerRegistry};
