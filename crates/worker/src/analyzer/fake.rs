// SPDX-License-Identifier: MIT

//! Fake analyzer for deterministic testing.

use super::{AnalyzerOutput, AnalyzerProcessor};
use crate::error::WorkerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use sg_core::{Job, JobId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AnalyzerCall {
    pub job_id: JobId,
}

#[derive(Clone)]
pub struct FakeAnalyzerProcessor {
    inner: Arc<Mutex<FakeState>>,
}

struct FakeState {
    default_output: AnalyzerOutput,
    per_job: HashMap<JobId, AnalyzerOutput>,
    calls: Vec<AnalyzerCall>,
}

impl Default for FakeAnalyzerProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAnalyzerProcessor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                default_output: AnalyzerOutput {
                    success: true,
                    node_data: Some(serde_json::json!({})),
                    duration_ms: 0,
                    error: None,
                },
                per_job: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    pub fn set_default_output(&self, output: AnalyzerOutput) {
        self.inner.lock().default_output = output;
    }

    pub fn set_output_for(&self, job_id: JobId, output: AnalyzerOutput) {
        self.inner.lock().per_job.insert(job_id, output);
    }

    pub fn calls(&self) -> Vec<AnalyzerCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl AnalyzerProcessor for FakeAnalyzerProcessor {
    async fn analyze(&self, job: &Job) -> Result<AnalyzerOutput, WorkerError> {
        let mut state = self.inner.lock();
        state.calls.push(AnalyzerCall { job_id: job.id });
        Ok(state
            .per_job
            .get(&job.id)
            .cloned()
            .unwrap_or_else(|| state.default_output.clone()))
    }
}
