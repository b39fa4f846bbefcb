// SPDX-License-Identifier: MIT

//! Error types for the worker crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("analyzer invocation failed: {0}")]
    AnalyzerFailed(String),

    #[error("connection discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error(transparent)]
    Storage(#[from] sg_storage::StorageError),

    #[error(transparent)]
    Core(#[from] sg_core::CoreError),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("connection_discovery job missing context.nodeId")]
    MissingNodeId,

    #[error("prompt file not found: {0}")]
    PromptFileNotFound(String),

    #[error("missing required skills: {0}")]
    MissingRequiredSkills(String),
}
