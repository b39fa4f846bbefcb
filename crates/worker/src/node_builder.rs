// SPDX-License-Identifier: MIT

//! Merges the analyzer's raw JSON output with the fields the worker itself
//! derives (source, computer, analyzerVersion, signals) into a `Node`.

use crate::error::WorkerError;
use crate::segment::ResolvedSegment;
use crate::signals::{self, FrictionInputs};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sg_core::{
    Classification, Content, DaemonMeta, Lessons, Node, NodeId, NodeMetadata, Observations,
    Semantic, Source,
};

/// Shape of the analyzer's extracted JSON object, deserialized directly into
/// the core's own sub-structs where the field sets match.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzerNodeData {
    classification: AnalyzerClassification,
    content: Content,
    #[serde(default)]
    lessons: Lessons,
    #[serde(default)]
    observations: Observations,
    #[serde(default)]
    semantic: Semantic,
    #[serde(default)]
    tokens: Option<u64>,
    #[serde(default)]
    cost_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzerClassification {
    #[serde(rename = "type")]
    node_type: String,
    project: String,
    #[serde(default)]
    is_new_project: bool,
    #[serde(default)]
    had_clear_goal: bool,
}

/// Everything the worker computes deterministically, outside the analyzer's
/// JSON, needed to finish constructing a Node.
pub struct DerivedFields<'a> {
    pub node_id: NodeId,
    pub version: u32,
    pub prior_versions: Vec<u32>,
    pub session_file: String,
    pub segment: &'a ResolvedSegment<'a>,
    pub session_id: String,
    pub computer: String,
    pub analyzer_version: String,
    pub duration_ms: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub abandoned_restart: bool,
    pub was_resumed: bool,
    pub segment_start_id: Option<String>,
    pub segment_end_id: Option<String>,
}

pub fn build_node(
    analyzer_json: &serde_json::Value,
    derived: DerivedFields<'_>,
) -> Result<Node, WorkerError> {
    let data: AnalyzerNodeData = serde_json::from_value(analyzer_json.clone())
        .map_err(|e| WorkerError::SchemaValidation(e.to_string()))?;

    let manual_flags = signals::manual_flags(derived.segment.entries);
    let friction_signals = signals::friction_signals(&FrictionInputs {
        is_last_segment: derived.segment.is_last_segment,
        was_resumed: derived.was_resumed,
        abandoned_restart: derived.abandoned_restart,
    });
    let delight_signals = signals::delight_signals(&data.content.outcome);

    Ok(Node {
        id: derived.node_id,
        version: derived.version,
        prior_versions: derived.prior_versions,
        source: Source {
            session_file: derived.session_file,
            segment_start: derived.segment_start_id,
            segment_end: derived.segment_end_id,
            entry_count: derived.segment.entry_count,
            computer: derived.computer,
            session_id: derived.session_id,
        },
        classification: Classification {
            node_type: data.classification.node_type,
            project: data.classification.project,
            is_new_project: data.classification.is_new_project,
            had_clear_goal: data.classification.had_clear_goal,
        },
        content: data.content,
        lessons: data.lessons,
        observations: data.observations,
        metadata: NodeMetadata {
            tokens: data.tokens,
            cost_usd: data.cost_usd,
            duration_ms: derived.duration_ms,
            started_at: derived.started_at,
            completed_at: Some(derived.completed_at),
            analyzer_version: derived.analyzer_version,
        },
        semantic: data.semantic,
        daemon_meta: DaemonMeta {
            is_new_project: data.classification.is_new_project,
            had_clear_goal: data.classification.had_clear_goal,
            abandoned_restart: derived.abandoned_restart,
            friction_signals,
            delight_signals,
            manual_flags,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::ResolvedSegment;

    #[test]
    fn builds_node_from_valid_analyzer_json() {
        let analyzer_json = serde_json::json!({
            "classification": {"type": "task", "project": "proj", "isNewProject": true, "hadClearGoal": true},
            "content": {"summary": "did a thing", "outcome": "success"},
            "lessons": {},
            "observations": {},
            "semantic": {"tags": ["rust"]},
        });

        let segment = ResolvedSegment {
            entries: &[],
            entry_count: 0,
            is_last_segment: true,
        };

        let derived = DerivedFields {
            node_id: NodeId::new(),
            version: 1,
            prior_versions: Vec::new(),
            session_file: "s.jsonl".into(),
            segment: &segment,
            session_id: "sess-1".into(),
            computer: "desktop".into(),
            analyzer_version: "abcd1234abcd1234".into(),
            duration_ms: Some(1200),
            started_at: Some(Utc::now()),
            completed_at: Utc::now(),
            abandoned_restart: false,
            was_resumed: false,
            segment_start_id: None,
            segment_end_id: None,
        };

        let node = build_node(&analyzer_json, derived).expect("build");
        assert_eq!(node.classification.project, "proj");
        assert_eq!(node.semantic.tags, vec!["rust"]);
        assert!(node.daemon_meta.friction_signals.is_empty());
        assert_eq!(node.daemon_meta.delight_signals, vec!["clean_completion"]);
    }

    #[test]
    fn missing_classification_field_fails_to_build() {
        let analyzer_json = serde_json::json!({
            "content": {"summary": "x", "outcome": "success"},
        });
        let segment = ResolvedSegment {
            entries: &[],
            entry_count: 0,
            is_last_segment: true,
        };
        let derived = DerivedFields {
            node_id: NodeId::new(),
            version: 1,
            prior_versions: Vec::new(),
            session_file: "s.jsonl".into(),
            segment: &segment,
            session_id: "sess-1".into(),
            computer: "desktop".into(),
            analyzer_version: "abcd1234abcd1234".into(),
            duration_ms: None,
            started_at: None,
            completed_at: Utc::now(),
            abandoned_restart: false,
            was_resumed: false,
            segment_start_id: None,
            segment_end_id: None,
        };
        assert!(build_node(&analyzer_json, derived).is_err());
    }
}
