// SPDX-License-Identifier: MIT

//! Parsing of append-only JSON-Lines session transcripts.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The first line of a session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHeader {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub parent_session: Option<String>,
}

/// One transcript entry after the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub raw: serde_json::Value,
}

/// A fully parsed session transcript: header plus ordered entries.
#[derive(Debug, Clone)]
pub struct Session {
    pub header: SessionHeader,
    pub entries: Vec<SessionEntry>,
}

impl Session {
    /// Parse a `.jsonl` session file from disk.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| CoreError::MalformedSessionHeader(e.to_string()))?;
        Self::parse_reader(BufReader::new(file))
    }

    /// Parse a session transcript from any line-oriented reader (used by tests).
    pub fn parse_reader(reader: impl BufRead) -> Result<Self, CoreError> {
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or(CoreError::EmptySession)?
            .map_err(|e| CoreError::MalformedSessionHeader(e.to_string()))?;
        let header: SessionHeader = serde_json::from_str(&header_line)
            .map_err(|e| CoreError::MalformedSessionHeader(e.to_string()))?;

        let mut entries = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line.map_err(|e| CoreError::InvalidJsonlEntry {
                line: idx + 2,
                reason: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: SessionEntry =
                serde_json::from_str(&line).map_err(|e| CoreError::InvalidJsonlEntry {
                    line: idx + 2,
                    reason: e.to_string(),
                })?;
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(CoreError::EmptySession);
        }

        Ok(Session { header, entries })
    }

    /// Slice entries inclusively by entry id, defaulting unset bounds to file start/end.
    pub fn segment_slice(
        &self,
        start_entry_id: Option<&str>,
        end_entry_id: Option<&str>,
    ) -> Result<&[SessionEntry], CoreError> {
        let start_idx = match start_entry_id {
            Some(id) => self.index_of(id)?,
            None => 0,
        };
        let end_idx = match end_entry_id {
            Some(id) => self.index_of(id)?,
            None => self.entries.len() - 1,
        };
        if start_idx > end_idx {
            return Err(CoreError::ReversedSegmentBounds { start: start_idx, end: end_idx });
        }
        Ok(&self.entries[start_idx..=end_idx])
    }

    fn index_of(&self, entry_id: &str) -> Result<usize, CoreError> {
        self.entries
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or_else(|| CoreError::SegmentBoundNotFound(entry_id.to_string()))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
