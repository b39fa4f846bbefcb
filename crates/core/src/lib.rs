// SPDX-License-Identifier: MIT

//! Shared domain types for the session-graph daemon: ids, clock abstraction,
//! job/node/edge models, session transcript parsing, error classification,
//! and configuration.

#[macro_use]
mod macros;

pub mod classifier;
pub mod clock;
pub mod config;
pub mod edge;
pub mod error;
pub mod id;
pub mod job;
pub mod node;
pub mod session;
pub mod topology;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::Config;
pub use edge::{Edge, EdgeId, EdgeType};
pub use error::{CoreError, ErrorCategory, ErrorRecord};
pub use id::HexId;
pub use job::{Job, JobContext, JobId, JobInput, JobStatus, JobType, SegmentBounds};
pub use node::{Classification, Content, DaemonMeta, Lessons, Node, NodeId, NodeMetadata, Observations, Semantic, Source};
pub use session::{Session, SessionEntry, SessionHeader};
pub use topology::{SpokeRoot, Topology};
