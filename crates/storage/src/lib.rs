// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! SQL-backed storage for the durable work queue and the persisted knowledge
//! graph: job rows, nodes, edges, and a JSON object store mirroring nodes.

mod error;
mod migrations;
mod nodes;
mod object_store;
mod queue;

pub use error::StorageError;
pub use nodes::{NodeStore, UpsertOutcome};
pub use object_store::ObjectStore;
pub use queue::{DailyStats, JobCounts, Queue, QueueStats};
