// SPDX-License-Identifier: MIT

//! Error types for the watcher.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to start watcher for {path}: {source}")]
    StartFailed {
        path: String,
        #[source]
        source: notify::Error,
    },

    #[error("failed to create watch root {path}: {source}")]
    CreateRootFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stat failed for {path}: {source}")]
    StatFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
