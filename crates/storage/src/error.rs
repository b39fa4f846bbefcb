// SPDX-License-Identifier: MIT

//! Error types for the storage layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("object store io error at {path}: {source}")]
    ObjectStoreIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] sg_core::CoreError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
