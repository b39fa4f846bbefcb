use super::*;

#[test]
fn canonical_priorities_match_contract() {
    assert_eq!(JobType::UserTriggered.canonical_priority(), 10);
    assert_eq!(JobType::Fork.canonical_priority(), 50);
    assert_eq!(JobType::Initial.canonical_priority(), 100);
    assert_eq!(JobType::Reanalysis.canonical_priority(), 200);
    assert_eq!(JobType::ConnectionDiscovery.canonical_priority(), 300);
}

#[test]
fn job_type_round_trips_through_display_and_from_str() {
    for jt in [
        JobType::Initial,
        JobType::Fork,
        JobType::Reanalysis,
        JobType::ConnectionDiscovery,
        JobType::UserTriggered,
    ] {
        let s = jt.to_string();
        assert_eq!(s.parse::<JobType>().expect("valid job type string"), jt);
    }
}

fn sample_job(status: JobStatus, worker_id: Option<&str>, locked_until: Option<DateTime<Utc>>) -> Job {
    Job {
        id: JobId::new(),
        job_type: JobType::Initial,
        priority: JobType::Initial.canonical_priority(),
        session_file: "/sessions/a.jsonl".into(),
        segment: None,
        context: JobContext::new(),
        status,
        queued_at: Utc::now(),
        started_at: None,
        completed_at: None,
        retry_count: 0,
        max_retries: Job::DEFAULT_MAX_RETRIES,
        last_error: None,
        worker_id: worker_id.map(str::to_string),
        locked_until,
    }
}

#[test]
fn running_job_without_lease_violates_invariant() {
    assert!(!sample_job(JobStatus::Running, None, None).invariant_holds());
    assert!(sample_job(JobStatus::Running, Some("w1"), Some(Utc::now())).invariant_holds());
}

#[test]
fn terminal_job_with_lease_violates_invariant() {
    assert!(!sample_job(JobStatus::Completed, Some("w1"), Some(Utc::now())).invariant_holds());
    assert!(sample_job(JobStatus::Completed, None, None).invariant_holds());
}

#[test]
fn target_node_id_prefers_existing_node_id() {
    let mut job = sample_job(JobStatus::Pending, None, None);
    job.context
        .insert("existingNodeId".into(), serde_json::json!("abcdef0123456789"));
    job.context.insert("nodeId".into(), serde_json::json!("fedcba9876543210"));
    assert_eq!(job.target_node_id().expect("node id present").as_str(), "abcdef0123456789");
}

#[test]
fn target_node_id_falls_back_to_node_id() {
    let mut job = sample_job(JobStatus::Pending, None, None);
    job.context.insert("nodeId".into(), serde_json::json!("fedcba9876543210"));
    assert_eq!(job.target_node_id().expect("node id present").as_str(), "fedcba9876543210");
}

#[test]
fn target_node_id_absent_when_context_empty() {
    let job = sample_job(JobStatus::Pending, None, None);
    assert!(job.target_node_id().is_none());
}
