// SPDX-License-Identifier: MIT

//! Outbound notification seams: `onNodeCreated` / `onJobFailed`, modeled as
//! trait objects rather than closures so the composition root can swap in
//! real delivery (SSE, desktop notifications, ...) without the worker
//! depending on it.

use async_trait::async_trait;
use sg_core::{ErrorRecord, Job, Node};

#[async_trait]
pub trait NodeSink: Clone + Send + Sync + 'static {
    async fn on_node_created(&self, node: &Node, created: bool);
}

#[async_trait]
pub trait JobFailureSink: Clone + Send + Sync + 'static {
    async fn on_job_failed(&self, job: &Job, error: &ErrorRecord);
}

/// The watcher's per-file `analyzing` flag, seen from the worker side.
/// `markAnalyzing` is set by the composition root when a job is enqueued
/// (see `spawn_idle_bridge`); `mark_analyzed` is the worker's half, fired
/// once a job reaches a terminal state (completed, or permanently failed)
/// so the watcher stops treating the file as under analysis.
pub trait SessionTracker: Clone + Send + Sync + 'static {
    fn mark_analyzed(&self, session_file: &str);
}

/// A sink that does nothing; the default when the composition root wires in
/// no external notification.
#[derive(Debug, Clone, Default)]
pub struct NoOpNodeSink;

#[async_trait]
impl NodeSink for NoOpNodeSink {
    async fn on_node_created(&self, _node: &Node, _created: bool) {}
}

#[derive(Debug, Clone, Default)]
pub struct NoOpJobFailureSink;

#[async_trait]
impl JobFailureSink for NoOpJobFailureSink {
    async fn on_job_failed(&self, _job: &Job, _error: &ErrorRecord) {}
}

/// A tracker that does nothing; the default when no watcher is wired in
/// (e.g. a worker driven directly against a pre-seeded queue).
#[derive(Debug, Clone, Default)]
pub struct NoOpSessionTracker;

impl SessionTracker for NoOpSessionTracker {
    fn mark_analyzed(&self, _session_file: &str) {}
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobFailureSink, FakeNodeSink, FakeSessionTracker};
