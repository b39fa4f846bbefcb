// SPDX-License-Identifier: MIT

//! Error types shared across the core: error records persisted on job rows,
//! error classification categories, and the crate-level error enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised directly by `sg-core` (parsing, validation, invariant checks).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid value for {field}: {value}")]
    InvalidEnumValue { field: &'static str, value: String },

    #[error("malformed session header: {0}")]
    MalformedSessionHeader(String),

    #[error("invalid jsonl entry at line {line}: {reason}")]
    InvalidJsonlEntry { line: usize, reason: String },

    #[error("empty session: no entries")]
    EmptySession,

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("entry id not found in segment: {0}")]
    SegmentBoundNotFound(String),

    #[error("segment start index {start} is after end index {end}")]
    ReversedSegmentBounds { start: usize, end: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Broad category an error is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Transient,
    Permanent,
    Unknown,
}

crate::simple_display!(ErrorCategory {
    Transient => "transient",
    Permanent => "permanent",
    Unknown => "unknown",
});

/// Structured error persisted as a JSON string on the job row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub category: ErrorCategory,
    pub reason: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorRecord {
    const MAX_MESSAGE_LEN: usize = 1000;
    const MAX_STACK_LEN: usize = 2000;

    pub fn new(
        at: DateTime<Utc>,
        category: ErrorCategory,
        reason: impl Into<String>,
        message: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        Self {
            timestamp: at,
            category,
            reason: reason.into(),
            message: truncate_chars(&message.into(), Self::MAX_MESSAGE_LEN),
            stack: stack.map(|s| truncate_chars(&s, Self::MAX_STACK_LEN)),
        }
    }

    /// Serialize to the JSON string stored on the job row.
    pub fn format_for_storage(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse back the JSON string stored on the job row.
    pub fn parse_stored(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
