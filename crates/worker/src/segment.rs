// SPDX-License-Identifier: MIT

//! Segment extraction: locates a job's entry-id bounds within a parsed
//! session and slices out the entries the analyzer was given to work with.

use sg_core::{CoreError, Job, Session, SessionEntry};

/// The slice of entries a job's segment bounds select, plus the reported
/// entry count (the slice length the Node's `source.entryCount` uses).
pub struct ResolvedSegment<'a> {
    pub entries: &'a [SessionEntry],
    pub entry_count: usize,
    pub is_last_segment: bool,
}

/// Resolve `job`'s segment bounds against `session`. Unset bounds default to
/// file start/end; `isLastSegment` is true exactly when `segmentEnd` is unset.
pub fn resolve<'a>(job: &Job, session: &'a Session) -> Result<ResolvedSegment<'a>, CoreError> {
    let (start, end) = match &job.segment {
        Some(bounds) => (bounds.start_entry_id.as_deref(), bounds.end_entry_id.as_deref()),
        None => (None, None),
    };
    let entries = session.segment_slice(start, end)?;
    Ok(ResolvedSegment {
        entries,
        entry_count: entries.len(),
        is_last_segment: end.is_none(),
    })
}
