// SPDX-License-Identifier: MIT

//! Typed configuration, constructed by the composition root from environment
//! variables with the hardcoded defaults below as fallback. No config-file or
//! CLI-flag parsing — see the daemon's `main.rs`.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub idle_timeout: Duration,
    pub stability_threshold_local: Duration,
    pub stability_threshold_spoke: Duration,
    pub poll_interval: Duration,
    pub max_depth: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10 * 60),
            stability_threshold_local: Duration::from_secs(5),
            stability_threshold_spoke: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            max_depth: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub lock_duration: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lock_duration: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub env_retry_interval: Duration,
    pub env_check_chunk: Duration,
    pub analyzer_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5_000),
            env_retry_interval: Duration::from_secs(30),
            env_check_chunk: Duration::from_secs(1),
            analyzer_timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// Root config tree assembled by the composition root.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub watcher: WatcherConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub retry_policy: crate::classifier::RetryPolicy,
    pub topology: crate::topology::Topology,
}
