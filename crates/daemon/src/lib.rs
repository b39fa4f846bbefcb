// SPDX-License-Identifier: MIT

//! The `sgd` daemon: watches session directories, feeds quiescent sessions
//! into a durable queue, and runs a worker pool against them. This crate is
//! the composition root only — the queue, watcher and worker crates carry
//! the actual logic.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod analyzer;
pub mod composition;
pub mod config;
pub mod env;
pub mod lifecycle;

pub use analyzer::SubprocessAnalyzer;
pub use composition::{CompositionError, Daemon, DaemonInit};
pub use lifecycle::{acquire_lock, LifecycleError, LockGuard, Paths};
