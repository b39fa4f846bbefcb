// SPDX-License-Identifier: MIT

//! The worker pull loop: dequeue one job at a time, run it through the
//! analysis pipeline, and persist the result.

use crate::analyzer::AnalyzerProcessor;
use crate::computer;
use crate::discoverer::ConnectionDiscoverer;
use crate::error::WorkerError;
use crate::node_builder::{self, DerivedFields};
use crate::segment;
use crate::signals;
use crate::sinks::{JobFailureSink, NodeSink, SessionTracker};
use parking_lot::Mutex;
use sg_core::classifier;
use sg_core::clock::Clock;
use sg_core::{EdgeType, ErrorCategory, ErrorRecord, Job, JobId, JobType, Node, NodeId, Session, Topology};
use sg_storage::{NodeStore, Queue};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Immutable environment the worker validates before entering its main loop.
#[derive(Debug, Clone)]
pub struct WorkerEnvironment {
    pub prompt_path: PathBuf,
    pub required_skills: Vec<PathBuf>,
}

/// Point-in-time view of a worker's state, for `getStatus()` observers.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub current_job: Option<JobId>,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
}

/// Drives the pull loop: `dequeue`, `processJob`, repeat. Generic over its
/// collaborators so tests can wire in fakes (see the `fake` module of each).
#[derive(Clone)]
pub struct Worker<P, D, NS, FS, ST, C>
where
    P: AnalyzerProcessor,
    D: ConnectionDiscoverer,
    NS: NodeSink,
    FS: JobFailureSink,
    ST: SessionTracker,
    C: Clock,
{
    worker_id: String,
    queue: Queue<C>,
    nodes: Arc<NodeStore>,
    analyzer: P,
    discoverer: D,
    node_sink: NS,
    failure_sink: FS,
    session_tracker: ST,
    clock: C,
    topology: Topology,
    env: WorkerEnvironment,
    poll_interval: StdDuration,
    env_retry_interval: StdDuration,
    env_check_chunk: StdDuration,
    running: Arc<AtomicBool>,
    current_job: Arc<Mutex<Option<JobId>>>,
    jobs_succeeded: Arc<AtomicU64>,
    jobs_failed: Arc<AtomicU64>,
}

impl<P, D, NS, FS, ST, C> Worker<P, D, NS, FS, ST, C>
where
    P: AnalyzerProcessor,
    D: ConnectionDiscoverer,
    NS: NodeSink,
    FS: JobFailureSink,
    ST: SessionTracker,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worker_id: impl Into<String>,
        queue: Queue<C>,
        nodes: Arc<NodeStore>,
        analyzer: P,
        discoverer: D,
        node_sink: NS,
        failure_sink: FS,
        session_tracker: ST,
        clock: C,
        topology: Topology,
        env: WorkerEnvironment,
        config: &sg_core::config::WorkerConfig,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            queue,
            nodes,
            analyzer,
            discoverer,
            node_sink,
            failure_sink,
            session_tracker,
            clock,
            topology,
            env,
            poll_interval: config.poll_interval,
            env_retry_interval: config.env_retry_interval,
            env_check_chunk: config.env_check_chunk,
            running: Arc::new(AtomicBool::new(true)),
            current_job: Arc::new(Mutex::new(None)),
            jobs_succeeded: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            worker_id: self.worker_id.clone(),
            current_job: *self.current_job.lock(),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn validate_environment(&self) -> Result<(), WorkerError> {
        if !self.env.prompt_path.exists() {
            return Err(WorkerError::PromptFileNotFound(
                self.env.prompt_path.display().to_string(),
            ));
        }
        let missing: Vec<String> = self
            .env
            .required_skills
            .iter()
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(WorkerError::MissingRequiredSkills(missing.join(", ")));
        }
        Ok(())
    }

    /// Sleep for `total`, in `chunk`-sized increments, returning early once
    /// `stop()` clears the running flag.
    async fn interruptible_sleep(&self, total: StdDuration, chunk: StdDuration) {
        let mut remaining = total;
        while remaining > StdDuration::ZERO && self.is_running() {
            let step = remaining.min(chunk);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
    }

    /// Runs until `stop()` is called.
    pub async fn run(&self) {
        while self.is_running() {
            if let Err(e) = self.validate_environment() {
                tracing::warn!(worker_id = %self.worker_id, error = %e, "worker environment invalid, idling");
                self.interruptible_sleep(self.env_retry_interval, self.env_check_chunk).await;
                continue;
            }

            match self.queue.dequeue(&self.worker_id) {
                Ok(Some(job)) => self.run_job(job).await,
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    tracing::error!(worker_id = %self.worker_id, error = %e, "dequeue failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn run_job(&self, job: Job) {
        *self.current_job.lock() = Some(job.id);
        let result = self.process_job(&job).await;
        *self.current_job.lock() = None;

        match result {
            Ok(()) => {
                self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
                self.session_tracker.mark_analyzed(&job.session_file);
            }
            Err(e) => {
                self.jobs_failed.fetch_add(1, Ordering::Relaxed);
                self.handle_job_failure(&job, &e.to_string()).await;
            }
        }
    }

    async fn process_job(&self, job: &Job) -> Result<(), WorkerError> {
        if job.job_type == JobType::ConnectionDiscovery {
            let node_id = job.target_node_id().ok_or(WorkerError::MissingNodeId)?;
            self.discoverer.discover(&node_id).await?;
            self.queue.complete(&job.id, &node_id)?;
            return Ok(());
        }

        let output = self.analyzer.analyze(job).await?;
        if !output.success {
            return Err(WorkerError::AnalyzerFailed(
                output.error.unwrap_or_else(|| "analyzer reported failure".to_string()),
            ));
        }
        let node_data = output
            .node_data
            .ok_or_else(|| WorkerError::SchemaValidation("analyzer returned no node data".to_string()))?;

        let session = Session::parse_file(&job.session_file)?;
        let resolved = segment::resolve(job, &session)?;

        let project = node_data.pointer("/classification/project").and_then(|v| v.as_str());
        let files_touched: Vec<String> = node_data
            .pointer("/content/filesTouched")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        let segment_start = resolved
            .entries
            .first()
            .map(|e| e.timestamp)
            .unwrap_or(session.header.timestamp);

        let prior_node = match project {
            Some(project) => self.nodes.latest_in_project_before(project, segment_start)?,
            None => None,
        };
        let abandoned_restart = match &prior_node {
            Some(prior) => signals::is_abandoned_restart(
                &prior.content.outcome,
                prior.metadata.completed_at.or(prior.metadata.started_at).unwrap_or(segment_start),
                segment_start,
                &prior.content.files_touched,
                &files_touched,
            ),
            None => false,
        };
        let was_resumed = job.boundary_type() == Some("resume");

        let analyzer_version = crate::prompt_version::version_for_file(&self.env.prompt_path)
            .map_err(|e| WorkerError::PromptFileNotFound(e.to_string()))?;
        let computer = computer::computer_for_path(std::path::Path::new(&job.session_file), &self.topology);

        let existing_node_id = existing_node_id(job);
        let (node_id, version, prior_versions) = match existing_node_id {
            Some(id) => {
                let latest = self.nodes.latest_version(&id)?;
                match latest {
                    Some(v) => (id, v + 1, (1..=v).collect()),
                    None => (id, 1, Vec::new()),
                }
            }
            // No explicit reanalysis target: this is a brand-new node, but
            // derive its id from the job id rather than minting a fresh
            // random one. A crash between `upsert` and `queue.complete`
            // re-dequeues the same job (same job.id) for a second
            // processJob pass, which must land on the same node id and
            // version so the upsert is a no-op, not a duplicate node.
            None => (derive_node_id(job), 1, Vec::new()),
        };

        let derived = DerivedFields {
            node_id,
            version,
            prior_versions,
            session_file: job.session_file.clone(),
            segment: &resolved,
            session_id: session.header.id.clone(),
            computer,
            analyzer_version,
            duration_ms: Some(output.duration_ms),
            started_at: job.started_at,
            completed_at: self.clock.utc_now(),
            abandoned_restart,
            was_resumed,
            segment_start_id: job.segment.as_ref().and_then(|s| s.start_entry_id.clone()),
            segment_end_id: job.segment.as_ref().and_then(|s| s.end_entry_id.clone()),
        };

        let node = node_builder::build_node(&node_data, derived)?;
        let upsert_outcome = self.nodes.upsert(&node)?;

        if job.job_type == JobType::Initial && upsert_outcome.created {
            self.create_structural_edges(job, &node)?;
        }

        self.queue.complete(&job.id, &node.id)?;
        self.node_sink.on_node_created(&node, upsert_outcome.created).await;
        Ok(())
    }

    /// Links the new node to its predecessor, carried in `context.nodeId`
    /// (distinct from `context.existingNodeId`, which instead means "this job
    /// is a new version of that node" and is handled in node-id derivation).
    /// The edge type is whatever `context.boundaryType` maps to; an unset or
    /// unrecognized boundary type means no edge is created.
    fn create_structural_edges(&self, job: &Job, node: &Node) -> Result<(), WorkerError> {
        let Some(predecessor) = job.context.get("nodeId").and_then(|v| v.as_str()).map(NodeId::from_string) else {
            return Ok(());
        };
        let Some(edge_type) = job.boundary_type().and_then(EdgeType::from_boundary_type) else {
            return Ok(());
        };
        self.nodes.insert_edge(&sg_core::Edge {
            id: sg_core::EdgeId::new(),
            from_node: predecessor,
            to_node: node.id,
            edge_type,
        })?;
        Ok(())
    }

    async fn handle_job_failure(&self, job: &Job, message: &str) {
        let classification = classifier::classify_error(message);
        let is_permanent = classification.category == ErrorCategory::Permanent;
        let error = ErrorRecord::new(self.clock.utc_now(), classification.category, classification.reason, message, None);

        let terminally_failed = if is_permanent {
            match self.queue.fail_permanently(&job.id, &error) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "failed to record job failure");
                    false
                }
            }
        } else {
            match self.queue.fail(&job.id, &error, classification.max_retries) {
                Ok(retry_exhausted) => retry_exhausted,
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "failed to record job failure");
                    false
                }
            }
        };

        // §7: onJobFailed fires only on permanent failure or retry-budget exhaustion,
        // never on a failure the queue is about to retry. The same condition
        // gates mark_analyzed: a requeued job is still a non-terminal job for
        // this file, so the watcher must keep treating it as analyzing.
        if is_permanent || terminally_failed {
            self.failure_sink.on_job_failed(job, &error).await;
            self.session_tracker.mark_analyzed(&job.session_file);
        }
    }
}

/// `context.existingNodeId`: this job produces a new version of that node,
/// rather than creating a fresh one.
fn existing_node_id(job: &Job) -> Option<NodeId> {
    job.context.get("existingNodeId").and_then(|v| v.as_str()).map(NodeId::from_string)
}

/// Deterministic node id for a first-version node: `sha256(jobId)` truncated
/// to the same 16 hex characters every other id uses. Stable across retries
/// of the same job, unlike `NodeId::new()`.
fn derive_node_id(job: &Job) -> NodeId {
    use sha2::{Digest, Sha256};
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(job.id.as_str().as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in &digest[..8] {
        hex.push(HEX[(byte >> 4) as usize] as char);
        hex.push(HEX[(byte & 0x0f) as usize] as char);
    }
    NodeId::from_string(hex)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
