use super::*;
use sg_core::job::JobInput;
use sg_core::{ErrorCategory, FakeClock, JobType};

fn test_queue() -> Queue<FakeClock> {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    Queue::new(conn, FakeClock::new(), std::time::Duration::from_secs(1800)).expect("construct queue")
}

#[test]
fn enqueue_then_dequeue_round_trips_session_file() {
    let queue = test_queue();
    let id = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");

    let job = queue.dequeue("w1").expect("dequeue").expect("a job is available");
    assert_eq!(job.id, id);
    assert_eq!(job.session_file, "/sessions/a.jsonl");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.worker_id.as_deref(), Some("w1"));
}

#[test]
fn dequeue_returns_none_when_empty() {
    let queue = test_queue();
    assert!(queue.dequeue("w1").expect("dequeue").is_none());
}

#[test]
fn dequeue_prefers_lower_priority_then_older_queued_at() {
    let queue = test_queue();
    queue
        .enqueue(JobInput::new(JobType::Reanalysis, "/sessions/low.jsonl"))
        .expect("enqueue low priority");
    queue
        .enqueue(JobInput::new(JobType::UserTriggered, "/sessions/high.jsonl"))
        .expect("enqueue high priority");

    let job = queue.dequeue("w1").expect("dequeue").expect("a job is available");
    assert_eq!(job.session_file, "/sessions/high.jsonl");
}

#[test]
fn dequeue_does_not_return_an_already_running_job() {
    let queue = test_queue();
    queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue").expect("first dequeue wins");
    assert!(queue.dequeue("w2").expect("dequeue").is_none());
}

#[test]
fn complete_clears_lease_and_marks_completed() {
    let queue = test_queue();
    let id = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue");
    let node_id = sg_core::NodeId::new();
    queue.complete(&id, &node_id).expect("complete");

    let job = queue.get_job(&id).expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.worker_id.is_none());
    assert!(job.locked_until.is_none());
}

#[test]
fn fail_requeues_under_two_pow_retry_count_minutes_then_fails_after_budget() {
    let clock = FakeClock::new();
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let queue = Queue::new(conn, clock.clone(), std::time::Duration::from_secs(1800)).expect("construct queue");
    let now = clock.utc_now();

    let mut input = JobInput::new(JobType::Initial, "/sessions/a.jsonl");
    input.max_retries = Some(3);
    let id = queue.enqueue(input).expect("enqueue");

    let error = ErrorRecord::new(now, ErrorCategory::Transient, "timeout", "ETIMEDOUT", None);
    // 2^(retry_count before increment) minutes: +1 after attempt 1, +2 after 2, +4 after 3.
    let expected_delay_minutes = [1i64, 2, 4];

    for attempt in 1..=4u32 {
        queue.dequeue("w1").expect("dequeue");
        let terminally_failed = queue.fail(&id, &error, 10).expect("fail");
        let job = queue.get_job(&id).expect("get").expect("job exists");
        if attempt <= 3 {
            assert!(!terminally_failed, "attempt {attempt}");
            assert_eq!(job.status, JobStatus::Pending, "attempt {attempt}");
            assert_eq!(job.retry_count, attempt);
            let expected = now + chrono::Duration::minutes(expected_delay_minutes[(attempt - 1) as usize]);
            assert_eq!(job.locked_until, Some(expected), "attempt {attempt}");
        } else {
            assert!(terminally_failed);
            assert_eq!(job.status, JobStatus::Failed);
        }
    }
}

#[test]
fn fail_caps_retries_at_the_lower_of_job_and_category_budget() {
    let queue = test_queue();
    let mut input = JobInput::new(JobType::Initial, "/sessions/a.jsonl");
    input.max_retries = Some(5);
    let id = queue.enqueue(input).expect("enqueue");
    let error = ErrorRecord::new(Utc::now(), ErrorCategory::Transient, "failed to spawn", "failed to spawn pi process", None);

    // "failed to spawn" classifies with category_max_retries = 2, tighter than
    // the job's own max_retries = 5, so the job fails after 2 attempts, not 5.
    queue.dequeue("w1").expect("dequeue");
    let terminally_failed = queue.fail(&id, &error, 2).expect("fail 1");
    assert!(!terminally_failed);

    queue.dequeue("w1").expect("dequeue");
    let terminally_failed = queue.fail(&id, &error, 2).expect("fail 2");
    assert!(terminally_failed);

    let job = queue.get_job(&id).expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 2);
}

#[test]
fn fail_permanently_transitions_regardless_of_retry_budget() {
    let queue = test_queue();
    let id = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    let error = ErrorRecord::new(Utc::now(), ErrorCategory::Permanent, "enoent", "missing", None);
    queue.fail_permanently(&id, &error).expect("fail permanently");

    let job = queue.get_job(&id).expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Failed);
}

#[test]
fn retry_job_only_succeeds_from_failed_status() {
    let queue = test_queue();
    let id = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    assert!(!queue.retry_job(&id).expect("retry attempted while pending"));

    let error = ErrorRecord::new(Utc::now(), ErrorCategory::Permanent, "enoent", "missing", None);
    queue.fail_permanently(&id, &error).expect("fail permanently");
    assert!(queue.retry_job(&id).expect("retry succeeds from failed"));

    let job = queue.get_job(&id).expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.retry_count, 0);
}

#[test]
fn cancel_job_only_deletes_pending_rows() {
    let queue = test_queue();
    let id = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue");
    assert!(!queue.cancel_job(&id).expect("cancel running job"));

    let id2 = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/b.jsonl"))
        .expect("enqueue");
    assert!(queue.cancel_job(&id2).expect("cancel pending job"));
    assert!(queue.get_job(&id2).expect("get").is_none());
}

#[test]
fn release_stale_recovers_expired_leases_and_increments_retry_count() {
    let clock = FakeClock::new();
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let queue = Queue::new(conn, clock.clone(), std::time::Duration::from_secs(60)).expect("construct queue");

    let id1 = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    let id2 = queue
        .enqueue(JobInput::new(JobType::UserTriggered, "/sessions/b.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue a");
    queue.dequeue("w2").expect("dequeue b");

    clock.advance(std::time::Duration::from_secs(120));
    let recovered = queue.release_stale().expect("release stale");
    assert_eq!(recovered, 2);

    let job1 = queue.get_job(&id1).expect("get").expect("job exists");
    let job2 = queue.get_job(&id2).expect("get").expect("job exists");
    assert_eq!(job1.status, JobStatus::Pending);
    assert_eq!(job1.retry_count, 1);
    assert_eq!(job2.status, JobStatus::Pending);

    // Higher-priority job (user_triggered) dequeues first after recovery.
    let next = queue.dequeue("w3").expect("dequeue").expect("a job is available");
    assert_eq!(next.session_file, "/sessions/b.jsonl");
}

#[test]
fn release_stale_uses_the_same_retry_budget_boundary_as_fail() {
    let clock = FakeClock::new();
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let queue = Queue::new(conn, clock.clone(), std::time::Duration::from_secs(60)).expect("construct queue");

    let mut input = JobInput::new(JobType::Initial, "/sessions/a.jsonl");
    input.max_retries = Some(1);
    let id = queue.enqueue(input).expect("enqueue");

    // First expired lease: retry_count 0 < max_retries 1, so it's requeued,
    // same as a crashed worker's one remaining attempt via fail().
    queue.dequeue("w1").expect("dequeue 1");
    clock.advance(std::time::Duration::from_secs(120));
    assert_eq!(queue.release_stale().expect("release stale 1"), 1);
    let job = queue.get_job(&id).expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.retry_count, 1);

    // Second expired lease: retry_count 1 >= max_retries 1, budget exhausted.
    queue.dequeue("w2").expect("dequeue 2");
    clock.advance(std::time::Duration::from_secs(120));
    assert_eq!(queue.release_stale().expect("release stale 2"), 1);
    let job = queue.get_job(&id).expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Failed);
}

#[test]
fn release_all_running_clears_every_running_row_regardless_of_lease() {
    let queue = test_queue();
    queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue");

    let recovered = queue.release_all_running().expect("release all running");
    assert_eq!(recovered, 1);
    assert_eq!(queue.get_running_jobs().expect("get running").len(), 0);
}

#[test]
fn has_existing_job_matches_null_segment_bounds_with_is_null() {
    let queue = test_queue();
    queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");

    assert!(queue
        .has_existing_job("/sessions/a.jsonl", None, None)
        .expect("has existing job"));
    assert!(!queue
        .has_existing_job("/sessions/a.jsonl", Some("e1"), Some("e2"))
        .expect("has existing job"));
}

#[test]
fn get_job_counts_reflects_status_distribution() {
    let queue = test_queue();
    queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/b.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue");

    let counts = queue.get_job_counts().expect("get job counts");
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.running, 1);
}

#[test]
fn clear_old_completed_deletes_only_old_terminal_rows() {
    let clock = FakeClock::new();
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let queue = Queue::new(conn, clock.clone(), std::time::Duration::from_secs(1800)).expect("construct queue");

    let id = queue
        .enqueue(JobInput::new(JobType::Initial, "/sessions/a.jsonl"))
        .expect("enqueue");
    queue.dequeue("w1").expect("dequeue");
    let node_id = sg_core::NodeId::new();
    queue.complete(&id, &node_id).expect("complete");

    clock.advance(std::time::Duration::from_secs(60 * 60 * 24 * 40));
    let deleted = queue.clear_old_completed(30).expect("clear old completed");
    assert_eq!(deleted, 1);
    assert!(queue.get_job(&id).expect("get").is_none());
}
