use super::*;

fn sample_node() -> Node {
    Node {
        id: NodeId::from_string("abcdef0123456789"),
        version: 2,
        prior_versions: vec![1],
        source: Source {
            session_file: "/sessions/a.jsonl".into(),
            segment_start: None,
            segment_end: None,
            entry_count: 10,
            computer: "laptop".into(),
            session_id: "s1".into(),
        },
        classification: Classification {
            node_type: "feature".into(),
            project: "crate".into(),
            is_new_project: false,
            had_clear_goal: true,
        },
        content: Content::default(),
        lessons: Lessons::default(),
        observations: Observations::default(),
        metadata: NodeMetadata {
            tokens: Some(100),
            cost_usd: Some(0.01),
            duration_ms: Some(500),
            started_at: None,
            completed_at: None,
            analyzer_version: "v1".into(),
        },
        semantic: Semantic::default(),
        daemon_meta: DaemonMeta {
            is_new_project: false,
            had_clear_goal: true,
            abandoned_restart: false,
            friction_signals: vec![],
            delight_signals: vec![],
            manual_flags: vec![],
        },
    }
}

#[test]
fn object_store_path_is_year_month_id_version() {
    let node = sample_node();
    let at: DateTime<Utc> = "2026-03-05T00:00:00Z".parse().expect("valid fixture timestamp");
    assert_eq!(node.object_store_path(at), "2026/03/abcdef0123456789-v2.json");
}

#[test]
fn node_round_trips_through_json() {
    let node = sample_node();
    let raw = serde_json::to_string(&node).expect("serializes");
    let back: Node = serde_json::from_str(&raw).expect("deserializes");
    assert_eq!(back.id, node.id);
    assert_eq!(back.version, node.version);
}
