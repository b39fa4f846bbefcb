// SPDX-License-Identifier: MIT

//! Node: the product of a successful session analysis.

use crate::define_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_id! {
    /// Stable 16-hex-character node identifier.
    pub struct NodeId;
}

/// Where a node's content came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub session_file: String,
    pub segment_start: Option<String>,
    pub segment_end: Option<String>,
    pub entry_count: usize,
    pub computer: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(rename = "type")]
    pub node_type: String,
    pub project: String,
    pub is_new_project: bool,
    pub had_clear_goal: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub summary: String,
    pub outcome: String,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub files_touched: Vec<String>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub errors_seen: Vec<String>,
}

/// Lessons partitioned into the seven canonical scopes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lessons {
    #[serde(default)]
    pub project: Vec<String>,
    #[serde(default)]
    pub language: Vec<String>,
    #[serde(default)]
    pub framework: Vec<String>,
    #[serde(default)]
    pub tool: Vec<String>,
    #[serde(default)]
    pub workflow: Vec<String>,
    #[serde(default)]
    pub collaboration: Vec<String>,
    #[serde(default)]
    pub general: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observations {
    #[serde(default)]
    pub models_used: Vec<String>,
    #[serde(default)]
    pub prompting_wins: Vec<String>,
    #[serde(default)]
    pub prompting_failures: Vec<String>,
    #[serde(default)]
    pub model_quirks: Vec<String>,
    #[serde(default)]
    pub tool_use_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub tokens: Option<u64>,
    pub cost_usd: Option<f64>,
    pub duration_ms: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub analyzer_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semantic {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Fields the daemon itself derives, as opposed to ones the analyzer reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonMeta {
    pub is_new_project: bool,
    pub had_clear_goal: bool,
    pub abandoned_restart: bool,
    pub friction_signals: Vec<String>,
    pub delight_signals: Vec<String>,
    pub manual_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub version: u32,
    #[serde(default)]
    pub prior_versions: Vec<u32>,
    pub source: Source,
    pub classification: Classification,
    pub content: Content,
    pub lessons: Lessons,
    pub observations: Observations,
    pub metadata: NodeMetadata,
    pub semantic: Semantic,
    pub daemon_meta: DaemonMeta,
}

impl Node {
    /// Relative object-store path for this node version: `YYYY/MM/<id>-v<version>.json`.
    pub fn object_store_path(&self, created_at: DateTime<Utc>) -> String {
        format!(
            "{}/{}-v{}.json",
            created_at.format("%Y/%m"),
            self.id.as_str(),
            self.version
        )
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
