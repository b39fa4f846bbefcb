// SPDX-License-Identifier: MIT

//! Fake connection discoverer for deterministic testing.

use super::ConnectionDiscoverer;
use crate::error::WorkerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use sg_core::NodeId;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DiscovererCall {
    pub node_id: NodeId,
}

#[derive(Clone)]
pub struct FakeConnectionDiscoverer {
    inner: Arc<Mutex<FakeState>>,
}

struct FakeState {
    calls: Vec<DiscovererCall>,
    error: Option<String>,
}

impl Default for FakeConnectionDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConnectionDiscoverer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                error: None,
            })),
        }
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().error = Some(message.into());
    }

    pub fn calls(&self) -> Vec<DiscovererCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl ConnectionDiscoverer for FakeConnectionDiscoverer {
    async fn discover(&self, node_id: &NodeId) -> Result<(), WorkerError> {
        let mut state = self.inner.lock();
        state.calls.push(DiscovererCall { node_id: *node_id });
        if let Some(message) = state.error.clone() {
            return Err(WorkerError::DiscoveryFailed(message));
        }
        Ok(())
    }
}
