// SPDX-License-Identifier: MIT

//! Job: a unit of analysis work moving through the queue.

use crate::define_id;
use crate::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

define_id! {
    /// Stable 16-hex-character job identifier.
    pub struct JobId;
}

/// What kind of analysis a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Initial,
    Fork,
    Reanalysis,
    ConnectionDiscovery,
    UserTriggered,
}

impl JobType {
    /// Canonical priority for this job type: lower sorts sooner.
    pub fn canonical_priority(self) -> i64 {
        match self {
            JobType::UserTriggered => 10,
            JobType::Fork => 50,
            JobType::Initial => 100,
            JobType::Reanalysis => 200,
            JobType::ConnectionDiscovery => 300,
        }
    }
}

crate::simple_display!(JobType {
    Initial => "initial",
    Fork => "fork",
    Reanalysis => "reanalysis",
    ConnectionDiscovery => "connection_discovery",
    UserTriggered => "user_triggered",
});

impl std::str::FromStr for JobType {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(JobType::Initial),
            "fork" => Ok(JobType::Fork),
            "reanalysis" => Ok(JobType::Reanalysis),
            "connection_discovery" => Ok(JobType::ConnectionDiscovery),
            "user_triggered" => Ok(JobType::UserTriggered),
            other => Err(crate::error::CoreError::InvalidEnumValue {
                field: "job_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

crate::simple_display!(JobStatus {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    Failed => "failed",
});

impl std::str::FromStr for JobStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(crate::error::CoreError::InvalidEnumValue {
                field: "job_status",
                value: other.to_string(),
            }),
        }
    }
}

/// Inclusive entry-id bounds identifying a sub-range of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentBounds {
    pub start_entry_id: Option<String>,
    pub end_entry_id: Option<String>,
}

/// Opaque context carried by a job: `existingNodeId`, `nodeId`, `boundaryType`, `triggeredBy`, ...
pub type JobContext = HashMap<String, serde_json::Value>;

/// A unit of analysis work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub priority: i64,
    pub session_file: String,
    pub segment: Option<SegmentBounds>,
    pub context: JobContext,
    pub status: JobStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<crate::error::ErrorRecord>,
    pub worker_id: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl Job {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// `target_node_id` per the queue's `enqueue` contract: `existingNodeId ?? nodeId ?? null`.
    pub fn target_node_id(&self) -> Option<NodeId> {
        self.context
            .get("existingNodeId")
            .or_else(|| self.context.get("nodeId"))
            .and_then(|v| v.as_str())
            .map(NodeId::from_string)
    }

    pub fn boundary_type(&self) -> Option<&str> {
        self.context.get("boundaryType").and_then(|v| v.as_str())
    }

    /// `running` implies a live lease; `pending` implies none, or an expired one.
    pub fn invariant_holds(&self) -> bool {
        match self.status {
            JobStatus::Running => self.worker_id.is_some() && self.locked_until.is_some(),
            JobStatus::Completed | JobStatus::Failed => {
                self.worker_id.is_none() && self.locked_until.is_none()
            }
            JobStatus::Pending => true,
        }
    }
}

/// Input to `Queue::enqueue`.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub job_type: JobType,
    pub session_file: String,
    pub segment: Option<SegmentBounds>,
    pub context: JobContext,
    pub max_retries: Option<u32>,
}

impl JobInput {
    pub fn new(job_type: JobType, session_file: impl Into<String>) -> Self {
        Self {
            job_type,
            session_file: session_file.into(),
            segment: None,
            context: JobContext::new(),
            max_retries: None,
        }
    }
}

impl JobInput {
    crate::setters!(
        into {
            session_file: String,
        }
        option {
            segment: SegmentBounds,
            max_retries: u32,
        }
    );
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
