// SPDX-License-Identifier: MIT

//! Per-file tracking state.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// `{untracked -> tracked-fresh -> tracked-idle -> tracked-analyzing -> tracked-analyzed -> removed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    TrackedFresh,
    TrackedIdle,
    TrackedAnalyzing,
    TrackedAnalyzed,
    Removed,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub analyzing: bool,
    pub phase: SessionPhase,
    /// Cleared on every write; set once an idle event has fired for the
    /// current quiescent period, so at most one idle event fires per period.
    pub idle_fired: bool,
}

impl SessionState {
    pub fn fresh(path: PathBuf, now: DateTime<Utc>) -> Self {
        Self {
            path,
            last_modified: now,
            last_analyzed: None,
            analyzing: false,
            phase: SessionPhase::TrackedFresh,
            idle_fired: false,
        }
    }

    /// Invariant: `analyzing` implies a non-terminal job exists for this file.
    pub fn mark_analyzing(&mut self) {
        self.analyzing = true;
        self.phase = SessionPhase::TrackedAnalyzing;
    }

    pub fn mark_analyzed(&mut self, at: DateTime<Utc>) {
        self.analyzing = false;
        self.last_analyzed = Some(at);
        self.phase = SessionPhase::TrackedAnalyzed;
    }

    pub fn mark_removed(&mut self) {
        self.phase = SessionPhase::Removed;
    }

    pub fn record_write(&mut self, at: DateTime<Utc>) {
        self.last_modified = at;
        self.idle_fired = false;
        if self.phase != SessionPhase::TrackedAnalyzing {
            self.phase = SessionPhase::TrackedFresh;
        }
    }

    pub fn record_idle(&mut self) {
        self.idle_fired = true;
        self.phase = SessionPhase::TrackedIdle;
    }

    /// The idle rule: do nothing while analyzing, already fired, or removed.
    pub fn eligible_for_idle(&self) -> bool {
        !self.analyzing && !self.idle_fired && self.phase != SessionPhase::Removed
    }
}
