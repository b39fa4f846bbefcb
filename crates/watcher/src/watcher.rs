// SPDX-License-Identifier: MIT

//! File-system watcher with idle detection, built on the `notify` crate's
//! recommended OS-native watcher for discovering new `.jsonl` files, and a
//! per-file poll loop (matching the configured `pollInterval`) for
//! write-finish debouncing and idle detection.

use crate::discovery::{discover_jsonl_files, is_jsonl, WatchRoot};
use crate::error::WatcherError;
use crate::event::WatcherEvent;
use crate::session_state::SessionState;
use crate::stability;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use parking_lot::Mutex;
use sg_core::config::WatcherConfig;
use sg_core::Topology;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

type StateMap = Arc<Mutex<HashMap<PathBuf, SessionState>>>;

/// The session watcher. Cloning shares the underlying tracked-file state.
#[derive(Clone)]
pub struct Watcher {
    config: WatcherConfig,
    topology: Topology,
    states: StateMap,
    stopped: Arc<AtomicBool>,
    event_tx: mpsc::Sender<WatcherEvent>,
    _fs_watchers: Arc<Vec<RecommendedWatcher>>,
}

impl Watcher {
    /// Start watching `roots`. Missing directories are created; any other
    /// stat failure aborts start.
    pub fn start(
        roots: Vec<WatchRoot>,
        config: WatcherConfig,
        topology: Topology,
    ) -> Result<(Self, mpsc::Receiver<WatcherEvent>), WatcherError> {
        for root in &roots {
            ensure_root(&root.path)?;
        }

        let (event_tx, event_rx) = mpsc::channel(1024);
        let states: StateMap = Arc::new(Mutex::new(HashMap::new()));
        let stopped = Arc::new(AtomicBool::new(false));

        let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Result<notify::Event>>(1024);
        let mut fs_watchers = Vec::with_capacity(roots.len());
        for root in &roots {
            let tx = raw_tx.clone();
            let mut watcher = notify::recommended_watcher(move |res| {
                let _ = tx.blocking_send(res);
            })
            .map_err(|source| WatcherError::StartFailed {
                path: root.path.display().to_string(),
                source,
            })?;
            watcher
                .watch(&root.path, RecursiveMode::Recursive)
                .map_err(|source| WatcherError::StartFailed {
                    path: root.path.display().to_string(),
                    source,
                })?;
            fs_watchers.push(watcher);
        }

        let watcher = Self {
            config,
            topology,
            states,
            stopped,
            event_tx,
            _fs_watchers: Arc::new(fs_watchers),
        };

        for root in &roots {
            for path in discover_jsonl_files(&root.path, watcher.config.max_depth) {
                watcher.track_new_file(path);
            }
        }

        {
            let watcher = watcher.clone();
            tokio::spawn(async move {
                while let Some(res) = raw_rx.recv().await {
                    if watcher.stopped.load(Ordering::Relaxed) {
                        break;
                    }
                    match res {
                        Ok(event) => watcher.handle_raw_event(event),
                        Err(e) => {
                            let _ = watcher.event_tx.send(WatcherEvent::Error(e.to_string())).await;
                        }
                    }
                }
            });
        }

        let ready_tx = watcher.event_tx.clone();
        tokio::spawn(async move {
            let _ = ready_tx.send(WatcherEvent::Ready).await;
        });

        Ok((watcher, event_rx))
    }

    fn handle_raw_event(&self, event: notify::Event) {
        use notify::EventKind;
        for path in event.paths {
            if !is_jsonl(&path) {
                continue;
            }
            match event.kind {
                EventKind::Remove(_) => self.handle_removed(path),
                _ => {
                    let already_tracked = self.states.lock().contains_key(&path);
                    if !already_tracked {
                        self.track_new_file(path);
                    }
                    // Existing tracked files are driven by their own poll loop,
                    // which observes the size change on its next tick.
                }
            }
        }
    }

    fn handle_removed(&self, path: PathBuf) {
        let mut guard = self.states.lock();
        if let Some(state) = guard.get_mut(&path) {
            state.mark_removed();
        }
        drop(guard);
        self.send(WatcherEvent::Remove(path));
    }

    fn track_new_file(&self, path: PathBuf) {
        let now = chrono::Utc::now();
        {
            let mut guard = self.states.lock();
            if guard.contains_key(&path) {
                return;
            }
            guard.insert(path.clone(), SessionState::fresh(path.clone(), now));
        }
        self.send(WatcherEvent::New(path.clone()));
        self.spawn_poll_loop(path);
    }

    fn spawn_poll_loop(&self, path: PathBuf) {
        let watcher = self.clone();
        tokio::spawn(async move {
            watcher.poll_loop(path).await;
        });
    }

    async fn poll_loop(&self, path: PathBuf) {
        let stability_threshold = stability::threshold_for(&path, &self.topology, &self.config);
        let idle_timeout = self.config.idle_timeout;
        let poll_interval = self.config.poll_interval;

        let mut last_len = file_len(&path);
        let mut stable_since = std::time::Instant::now();
        let mut surfaced_change = false;

        loop {
            tokio::time::sleep(poll_interval).await;
            if self.stopped.load(Ordering::Relaxed) {
                return;
            }

            let Some(len) = std::fs::metadata(&path).ok().map(|m| m.len()) else {
                self.handle_removed(path);
                return;
            };

            if Some(len) != last_len {
                last_len = Some(len);
                stable_since = std::time::Instant::now();
                surfaced_change = false;
                let mut guard = self.states.lock();
                if let Some(state) = guard.get_mut(&path) {
                    state.record_write(chrono::Utc::now());
                }
                continue;
            }

            if !surfaced_change && stable_since.elapsed() >= stability_threshold {
                surfaced_change = true;
                self.send(WatcherEvent::Change(path.clone()));
            }

            let due_for_idle = {
                let guard = self.states.lock();
                guard
                    .get(&path)
                    .map(|s| s.eligible_for_idle() && stable_since.elapsed() >= idle_timeout)
                    .unwrap_or(false)
            };
            if due_for_idle {
                let mut guard = self.states.lock();
                if let Some(state) = guard.get_mut(&path) {
                    if state.eligible_for_idle() {
                        state.record_idle();
                        drop(guard);
                        self.send(WatcherEvent::Idle(path.clone()));
                    }
                }
            }
        }
    }

    fn send(&self, event: WatcherEvent) {
        if self.stopped.load(Ordering::Relaxed) {
            return;
        }
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(event).await;
        });
    }

    pub fn mark_analyzing(&self, path: &Path) {
        let mut guard = self.states.lock();
        if let Some(state) = guard.get_mut(path) {
            state.mark_analyzing();
        }
    }

    pub fn mark_analyzed(&self, path: &Path) {
        let mut guard = self.states.lock();
        if let Some(state) = guard.get_mut(path) {
            state.mark_analyzed(chrono::Utc::now());
        }
    }

    /// Stop watching. All subsequent events, including from in-flight poll
    /// loops, are silently dropped.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

fn file_len(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

fn ensure_root(path: &Path) -> Result<(), WatcherError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(WatcherError::StatFailed {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        }),
        Err(_) => std::fs::create_dir_all(path).map_err(|source| WatcherError::CreateRootFailed {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
