use super::*;
use chrono::{DateTime, Utc};
use sg_core::edge::EdgeType;
use sg_core::node::{Classification, Content, DaemonMeta, Lessons, NodeMetadata, Observations, Semantic, Source};
use tempfile::tempdir;

fn sample_node(id: &str, version: u32, project: &str) -> Node {
    Node {
        id: NodeId::from_string(id),
        version,
        prior_versions: (1..version).collect(),
        source: Source {
            session_file: "/sessions/a.jsonl".into(),
            segment_start: None,
            segment_end: None,
            entry_count: 5,
            computer: "laptop".into(),
            session_id: "s1".into(),
        },
        classification: Classification {
            node_type: "feature".into(),
            project: project.into(),
            is_new_project: false,
            had_clear_goal: true,
        },
        content: Content::default(),
        lessons: Lessons::default(),
        observations: Observations::default(),
        metadata: NodeMetadata {
            tokens: None,
            cost_usd: None,
            duration_ms: None,
            started_at: None,
            completed_at: Some("2026-01-01T00:00:00Z".parse().expect("valid fixture timestamp")),
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

fn test_store() -> (NodeStore, tempfile::TempDir) {
    let dir = tempdir().expect("tempdir");
    let conn = Arc::new(Mutex::new(Connection::open_in_memory().expect("open in-memory db")));
    let objects = ObjectStore::new(dir.path());
    (NodeStore::new(conn, objects).expect("construct node store"), dir)
}

#[test]
fn first_upsert_reports_created_true() {
    let (store, _dir) = test_store();
    let node = sample_node("abcdef0123456789", 1, "crate");
    let outcome = store.upsert(&node).expect("upsert");
    assert!(outcome.created);
}

#[test]
fn repeated_upsert_of_same_version_reports_created_false_and_is_idempotent() {
    let (store, _dir) = test_store();
    let node = sample_node("abcdef0123456789", 1, "crate");
    store.upsert(&node).expect("first upsert");
    let outcome = store.upsert(&node).expect("second upsert");
    assert!(!outcome.created);

    let fetched = store
        .get_node(&node.id, Some(1))
        .expect("get node")
        .expect("node exists");
    assert_eq!(fetched.version, 1);
}

#[test]
fn reanalysis_upsert_of_new_version_is_a_fresh_insert() {
    let (store, _dir) = test_store();
    let v1 = sample_node("abcdef0123456789", 1, "crate");
    store.upsert(&v1).expect("upsert v1");
    let v2 = sample_node("abcdef0123456789", 2, "crate");
    let outcome = store.upsert(&v2).expect("upsert v2");
    assert!(outcome.created);

    assert_eq!(store.latest_version(&v1.id).expect("latest version"), Some(2));
}

#[test]
fn latest_in_project_before_finds_most_recent_prior_node() {
    let (store, _dir) = test_store();
    let mut early = sample_node("abcdef0123456789", 1, "crate");
    early.metadata.completed_at = Some("2026-01-01T00:00:00Z".parse().expect("valid fixture timestamp"));
    store.upsert(&early).expect("upsert early");

    let cutoff: DateTime<Utc> = "2026-01-02T00:00:00Z".parse().expect("valid fixture timestamp");
    let found = store
        .latest_in_project_before("crate", cutoff)
        .expect("lookup")
        .expect("a prior node exists");
    assert_eq!(found.id, early.id);
}

#[test]
fn insert_edge_is_idempotent_under_retry() {
    let (store, _dir) = test_store();
    let edge = Edge {
        id: EdgeId::from_string("edge0000000000"),
        from_node: NodeId::from_string("a"),
        to_node: NodeId::from_string("b"),
        edge_type: EdgeType::Resume,
    };
    store.insert_edge(&edge).expect("first insert");
    store.insert_edge(&edge).expect("second insert does not duplicate");

    let edges = store.edges_for_node(&edge.from_node).expect("edges for node");
    assert_eq!(edges.len(), 1);
}
