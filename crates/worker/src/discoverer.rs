// SPDX-License-Identifier: MIT

//! The connection-discovery collaborator: given a just-created node, finds
//! and records semantic edges to unrelated-but-related prior nodes.

use crate::error::WorkerError;
use async_trait::async_trait;
use sg_core::NodeId;

#[async_trait]
pub trait ConnectionDiscoverer: Clone + Send + Sync + 'static {
    async fn discover(&self, node_id: &NodeId) -> Result<(), WorkerError>;
}

/// A discoverer that finds nothing; the default when the composition root
/// wires in no semantic-search collaborator.
#[derive(Debug, Clone, Default)]
pub struct NoOpConnectionDiscoverer;

#[async_trait]
impl ConnectionDiscoverer for NoOpConnectionDiscoverer {
    async fn discover(&self, _node_id: &NodeId) -> Result<(), WorkerError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DiscovererCall, FakeConnectionDiscoverer};
