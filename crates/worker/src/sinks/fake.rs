// SPDX-License-Identifier: MIT

//! Fake sinks that record calls for assertions.

use super::{JobFailureSink, NodeSink, SessionTracker};
use async_trait::async_trait;
use parking_lot::Mutex;
use sg_core::{ErrorRecord, Job, Node};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct FakeNodeSink {
    created: Arc<Mutex<Vec<(Node, bool)>>>,
}

impl FakeNodeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<(Node, bool)> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl NodeSink for FakeNodeSink {
    async fn on_node_created(&self, node: &Node, created: bool) {
        self.created.lock().push((node.clone(), created));
    }
}

#[derive(Clone, Default)]
pub struct FakeJobFailureSink {
    failures: Arc<Mutex<Vec<(Job, ErrorRecord)>>>,
}

impl FakeJobFailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<(Job, ErrorRecord)> {
        self.failures.lock().clone()
    }
}

#[async_trait]
impl JobFailureSink for FakeJobFailureSink {
    async fn on_job_failed(&self, job: &Job, error: &ErrorRecord) {
        self.failures.lock().push((job.clone(), error.clone()));
    }
}

#[derive(Clone, Default)]
pub struct FakeSessionTracker {
    analyzed: Arc<Mutex<Vec<String>>>,
}

impl FakeSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyzed(&self) -> Vec<String> {
        self.analyzed.lock().clone()
    }
}

impl SessionTracker for FakeSessionTracker {
    fn mark_analyzed(&self, session_file: &str) {
        self.analyzed.lock().push(session_file.to_string());
    }
}
