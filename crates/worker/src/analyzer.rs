// SPDX-License-Identifier: MIT

//! The analyzer collaborator: an external process (or fake, for tests) that
//! turns a job's session segment into raw node data.

use crate::error::WorkerError;
use async_trait::async_trait;
use serde_json::Value;
use sg_core::Job;

/// Raw result of invoking the analyzer on a job.
#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    pub success: bool,
    /// Present when `success`; the analyzer's JSON node fields (classification,
    /// content, lessons, observations, semantic, daemonMeta) prior to merge
    /// with worker-derived fields (source, computer, analyzerVersion, signals).
    pub node_data: Option<Value>,
    pub duration_ms: u64,
    /// Present when `!success`; fed to the error classifier.
    pub error: Option<String>,
}

#[async_trait]
pub trait AnalyzerProcessor: Clone + Send + Sync + 'static {
    async fn analyze(&self, job: &Job) -> Result<AnalyzerOutput, WorkerError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AnalyzerCall, FakeAnalyzerProcessor};
