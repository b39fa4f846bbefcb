// SPDX-License-Identifier: MIT

//! Deterministic local signal detection layered on top of the analyzer's
//! output: abandoned-restart detection and the three small signal sets
//! embedded in a Node's daemon metadata.

use chrono::{DateTime, Duration, Utc};
use sg_core::SessionEntry;
use std::collections::HashSet;

/// A prior restart counts as abandoned if it ended unsuccessfully, the new
/// segment picks up within this window of that end, and the two segments
/// touch substantially the same files.
pub const ABANDONED_RESTART_WINDOW: Duration = Duration::minutes(30);
const FILE_OVERLAP_THRESHOLD: f64 = 0.5;

/// `(prior outcome non-success) && (gap <= window) && (file overlap >= threshold)`.
pub fn is_abandoned_restart(
    prior_outcome: &str,
    prior_end: DateTime<Utc>,
    segment_start: DateTime<Utc>,
    prior_files_touched: &[String],
    segment_files_touched: &[String],
) -> bool {
    if prior_outcome.eq_ignore_ascii_case("success") {
        return false;
    }
    let gap = segment_start - prior_end;
    if gap < Duration::zero() || gap > ABANDONED_RESTART_WINDOW {
        return false;
    }
    file_overlap_ratio(prior_files_touched, segment_files_touched) >= FILE_OVERLAP_THRESHOLD
}

fn file_overlap_ratio(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b_set: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = a_set.intersection(&b_set).count();
    let smaller = a_set.len().min(b_set.len());
    intersection as f64 / smaller as f64
}

/// Inputs driving friction-signal detection, named after the job/context
/// fields they come from.
pub struct FrictionInputs {
    pub is_last_segment: bool,
    pub was_resumed: bool,
    pub abandoned_restart: bool,
}

pub fn friction_signals(inputs: &FrictionInputs) -> Vec<String> {
    let mut signals = Vec::new();
    if inputs.was_resumed {
        signals.push("resumed_after_gap".to_string());
    }
    if inputs.abandoned_restart {
        signals.push("abandoned_restart".to_string());
    }
    if !inputs.is_last_segment {
        signals.push("segment_truncated_mid_session".to_string());
    }
    signals
}

pub fn delight_signals(analyzer_outcome: &str) -> Vec<String> {
    if analyzer_outcome.eq_ignore_ascii_case("success") {
        vec!["clean_completion".to_string()]
    } else {
        Vec::new()
    }
}

/// Entries may carry an explicit `manualFlag` string or `manualFlags` array;
/// collected in encounter order, de-duplicated.
pub fn manual_flags(entries: &[SessionEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut flags = Vec::new();
    for entry in entries {
        if let Some(flag) = entry.raw.get("manualFlag").and_then(|v| v.as_str()) {
            if seen.insert(flag.to_string()) {
                flags.push(flag.to_string());
            }
        }
        if let Some(list) = entry.raw.get("manualFlags").and_then(|v| v.as_array()) {
            for item in list {
                if let Some(flag) = item.as_str() {
                    if seen.insert(flag.to_string()) {
                        flags.push(flag.to_string());
                    }
                }
            }
        }
    }
    flags
}
