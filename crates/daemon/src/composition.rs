// SPDX-License-Identifier: MIT

//! The composition root: owns the `Queue`, spawns the `Watcher`, spawns N
//! `Worker` tasks, and wires the watcher's idle events into the queue.

use crate::analyzer::SubprocessAnalyzer;
use crate::lifecycle::Paths;
use parking_lot::Mutex as PLMutex;
use sg_core::clock::SystemClock;
use sg_core::config::Config;
use sg_core::{JobInput, JobType, Topology};
use sg_storage::{NodeStore, Queue, StorageError};
use sg_watcher::{WatchRoot, Watcher, WatcherError, WatcherEvent};
use sg_worker::{NoOpConnectionDiscoverer, NoOpJobFailureSink, NoOpNodeSink, Worker, WorkerEnvironment};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type DaemonWorker = Worker<
    SubprocessAnalyzer,
    NoOpConnectionDiscoverer,
    NoOpNodeSink,
    NoOpJobFailureSink,
    WatcherSessionTracker,
    SystemClock,
>;

/// Adapts `Watcher::mark_analyzed` to `sg_worker::sinks::SessionTracker`.
/// Lives here, not in `sg-watcher` or `sg-worker`, so neither crate has to
/// depend on the other just for this one composition-root wire-up.
#[derive(Clone)]
struct WatcherSessionTracker(Watcher);

impl sg_worker::sinks::SessionTracker for WatcherSessionTracker {
    fn mark_analyzed(&self, session_file: &str) {
        self.0.mark_analyzed(std::path::Path::new(session_file));
    }
}

/// Owns every long-running task the daemon spawns and tears them down on `stop()`.
pub struct Daemon {
    queue: Queue<SystemClock>,
    watcher: Watcher,
    workers: Vec<DaemonWorker>,
    bridge_task: JoinHandle<()>,
    worker_tasks: Vec<JoinHandle<()>>,
}

pub struct DaemonInit {
    pub local_roots: Vec<PathBuf>,
    pub spoke_roots: Vec<PathBuf>,
    pub prompt_path: PathBuf,
    pub required_skills: Vec<PathBuf>,
    pub analyzer_command: Vec<String>,
    pub worker_count: usize,
}

impl Daemon {
    pub fn start(paths: &Paths, config: &Config, init: DaemonInit) -> Result<Self, CompositionError> {
        std::fs::create_dir_all(&paths.objects_path)?;

        let queue_conn = rusqlite::Connection::open(&paths.db_path).map_err(StorageError::from)?;
        let queue = Queue::new(queue_conn, SystemClock, config.queue.lock_duration)?;
        let recovered = queue.release_all_running()?;
        if recovered > 0 {
            info!(recovered, "released running jobs left over from an unclean shutdown");
        }

        let node_conn = Arc::new(PLMutex::new(
            rusqlite::Connection::open(&paths.db_path).map_err(StorageError::from)?,
        ));
        let objects = sg_storage::ObjectStore::new(paths.objects_path.clone());
        let nodes = Arc::new(NodeStore::new(node_conn, objects)?);

        let topology = build_topology(&init.spoke_roots);

        let roots: Vec<WatchRoot> = init
            .local_roots
            .iter()
            .map(|p| WatchRoot::local(p.clone()))
            .chain(init.spoke_roots.iter().map(|p| WatchRoot::spoke(p.clone())))
            .collect();
        let (watcher, watcher_rx) = Watcher::start(roots, config.watcher.clone(), topology.clone())?;

        let bridge_task = spawn_idle_bridge(queue.clone(), watcher.clone(), watcher_rx);

        let env = WorkerEnvironment {
            prompt_path: init.prompt_path,
            required_skills: init.required_skills,
        };
        let analyzer = SubprocessAnalyzer::new(init.analyzer_command, config.worker.analyzer_timeout);

        let mut workers = Vec::with_capacity(init.worker_count);
        let mut worker_tasks = Vec::with_capacity(init.worker_count);
        for i in 0..init.worker_count {
            let worker = Worker::new(
                format!("worker-{i}"),
                queue.clone(),
                nodes.clone(),
                analyzer.clone(),
                NoOpConnectionDiscoverer,
                NoOpNodeSink,
                NoOpJobFailureSink,
                WatcherSessionTracker(watcher.clone()),
                SystemClock,
                topology.clone(),
                env.clone(),
                &config.worker,
            );
            let spawned = worker.clone();
            worker_tasks.push(tokio::spawn(async move { spawned.run().await }));
            workers.push(worker);
        }

        Ok(Self {
            queue,
            watcher,
            workers,
            bridge_task,
            worker_tasks,
        })
    }

    /// The durable job queue, exposed for ambient stats/introspection callers.
    pub fn queue(&self) -> &Queue<SystemClock> {
        &self.queue
    }

    /// Stop the watcher and ask every worker to finish its current job and
    /// exit, then wait for all background tasks to join.
    pub async fn shutdown(self) {
        self.watcher.stop();
        self.bridge_task.abort();
        for worker in &self.workers {
            worker.stop();
        }
        for task in self.worker_tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = %e, "worker task panicked during shutdown");
                }
            }
        }
    }
}

/// Registers each spoke path under its own directory name.
fn build_topology(spoke_roots: &[PathBuf]) -> Topology {
    let mut topology = Topology::default();
    for path in spoke_roots {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        topology.register(path.clone(), name);
    }
    topology
}

/// Forward idle events to the queue as `initial` jobs, consulting
/// `has_existing_job` first so a quiescent file already queued or running
/// is not enqueued twice (Testable Property / scenario 3). `markAnalyzing`
/// is set here, at enqueue time, per SPEC_FULL.md §4.1; the worker (via
/// `WatcherSessionTracker`) clears it with `markAnalyzed` once the job
/// reaches a terminal state.
fn spawn_idle_bridge(
    queue: Queue<SystemClock>,
    watcher: Watcher,
    mut events: tokio::sync::mpsc::Receiver<WatcherEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                WatcherEvent::Idle(path) => {
                    let session_file = path.display().to_string();
                    match queue.has_existing_job(&session_file, None, None) {
                        Ok(true) => {
                            info!(session_file = %session_file, "idle session already queued, skipping");
                        }
                        Ok(false) => {
                            let input = JobInput::new(JobType::Initial, session_file.clone());
                            match queue.enqueue(input) {
                                Ok(id) => {
                                    watcher.mark_analyzing(&path);
                                    info!(job_id = %id, session_file = %session_file, "enqueued idle session");
                                }
                                Err(e) => error!(error = %e, session_file = %session_file, "failed to enqueue idle session"),
                            }
                        }
                        Err(e) => error!(error = %e, session_file = %session_file, "failed to check for existing job"),
                    }
                }
                WatcherEvent::Error(message) => {
                    warn!(error = %message, "watcher error");
                }
                WatcherEvent::New(_) | WatcherEvent::Change(_) | WatcherEvent::Remove(_) | WatcherEvent::Ready => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn topology_registers_spoke_roots_under_their_basename() {
        let topology = build_topology(&[PathBuf::from("/mnt/spokes/laptop")]);
        let spoke = topology.spoke_for(Path::new("/mnt/spokes/laptop/project/session.jsonl"));
        assert_eq!(spoke.map(|s| s.name.clone()), Some("laptop".to_string()));
    }

    #[tokio::test]
    async fn idle_bridge_skips_sessions_already_queued() {
        let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
        let queue = Queue::new(conn, SystemClock, std::time::Duration::from_secs(1800)).expect("construct queue");

        let dir = tempfile::tempdir().expect("tempdir");
        let (watcher, _watcher_rx) = Watcher::start(
            vec![WatchRoot::local(dir.path().to_path_buf())],
            sg_core::config::WatcherConfig::default(),
            Topology::default(),
        )
        .expect("start watcher");

        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let bridge = spawn_idle_bridge(queue.clone(), watcher, rx);

        let path = dir.path().join("a.jsonl");
        tx.send(WatcherEvent::Idle(path.clone())).await.expect("send idle");
        tx.send(WatcherEvent::Idle(path.clone())).await.expect("send idle again");
        drop(tx);
        bridge.await.expect("bridge task joins");

        let session_file = path.display().to_string();
        let pending = queue.get_pending_jobs(Some(&session_file), None).expect("get pending jobs");
        assert_eq!(pending.len(), 1);
    }
}
