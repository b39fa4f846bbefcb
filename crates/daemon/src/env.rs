// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon binary. No config
//! file or CLI flag parsing; every value here has a hardcoded default.

use std::path::PathBuf;
use std::time::Duration;

/// `SG_STATE_DIR` > `XDG_STATE_HOME/sessiongraph` > `~/.local/state/sessiongraph`.
pub fn state_dir() -> Result<PathBuf, crate::lifecycle::LifecycleError> {
    if let Ok(dir) = std::env::var("SG_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("sessiongraph"));
    }
    let home = std::env::var("HOME").map_err(|_| crate::lifecycle::LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/sessiongraph"))
}

/// Colon-separated list of local directories to watch. Defaults to none.
pub fn watch_roots() -> Vec<PathBuf> {
    split_paths("SG_WATCH_ROOTS")
}

/// Colon-separated list of spoke (remotely-synced) directories to watch.
pub fn spoke_roots() -> Vec<PathBuf> {
    split_paths("SG_SPOKE_ROOTS")
}

fn split_paths(var: &str) -> Vec<PathBuf> {
    std::env::var(var)
        .ok()
        .map(|v| v.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect())
        .unwrap_or_default()
}

/// Path to the prompt file the worker hashes into `analyzerVersion` and
/// requires to exist before entering the main loop.
pub fn prompt_path() -> PathBuf {
    std::env::var("SG_PROMPT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("prompts/analyze-session.md"))
}

/// Colon-separated list of required skill package paths.
pub fn required_skills() -> Vec<PathBuf> {
    split_paths("SG_REQUIRED_SKILLS")
}

/// The external analyzer command line, split on whitespace into program + args.
pub fn analyzer_command() -> Vec<String> {
    std::env::var("SG_ANALYZER_COMMAND")
        .ok()
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_else(|| vec!["sg-analyzer".to_string()])
}

/// Number of worker tasks sharing the one queue. Default 1.
pub fn worker_count() -> usize {
    std::env::var("SG_WORKER_COUNT")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Analyzer subprocess timeout override, in seconds.
pub fn analyzer_timeout() -> Option<Duration> {
    std::env::var("SG_ANALYZER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
