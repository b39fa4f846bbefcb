// SPDX-License-Identifier: MIT

//! Durable, SQL-backed work queue: priority-FIFO dequeue with optimistic
//! locking, exponential-backoff retry, and duplicate suppression.

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sg_core::clock::Clock;
use sg_core::{ErrorRecord, Job, JobContext, JobId, JobInput, JobStatus, JobType, SegmentBounds};
use std::str::FromStr;
use std::sync::Arc;

/// Aggregate counts by job status, for `getJobCounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

/// One day's worth of completion stats, for `getDailyStats`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStats {
    pub day: String,
    pub completed: u64,
    pub failed: u64,
}

/// Overall queue stats, for `getStats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    pub total: u64,
    pub counts: JobCounts,
    pub avg_retry_count: f64,
}

/// The durable work queue. Cheap to clone; the connection is shared behind a lock.
#[derive(Clone)]
pub struct Queue<C: Clock> {
    conn: Arc<Mutex<Connection>>,
    clock: C,
    lock_duration: chrono::Duration,
}

impl<C: Clock> Queue<C> {
    pub fn new(conn: Connection, clock: C, lock_duration: std::time::Duration) -> Result<Self, StorageError> {
        crate::migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock,
            lock_duration: chrono::Duration::from_std(lock_duration).unwrap_or(chrono::Duration::seconds(1800)),
        })
    }

    pub fn enqueue(&self, input: JobInput) -> Result<JobId, StorageError> {
        let conn = self.conn.lock();
        let id = insert_job(&conn, &input, self.clock.utc_now())?;
        tracing::debug!(job_id = %id, session_file = %input.session_file, job_type = %input.job_type, "enqueued job");
        Ok(id)
    }

    pub fn enqueue_many(&self, inputs: Vec<JobInput>) -> Result<Vec<JobId>, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = self.clock.utc_now();
        let mut ids = Vec::with_capacity(inputs.len());
        for input in inputs {
            ids.push(insert_job(&tx, &input, now)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Two-step optimistic locking: select the winning row, then a conditional
    /// `UPDATE ... WHERE` that only one concurrent caller can succeed on.
    pub fn dequeue(&self, worker_id: &str) -> Result<Option<Job>, StorageError> {
        let conn = self.conn.lock();
        let now = self.clock.utc_now();

        let candidate_id: Option<String> = conn
            .query_row(
                "SELECT id FROM analysis_queue
                 WHERE status = 'pending' AND (locked_until IS NULL OR locked_until < ?1)
                 ORDER BY priority ASC, queued_at ASC
                 LIMIT 1",
                params![to_rfc3339(now)],
                |row| row.get(0),
            )
            .optional()?;

        let Some(candidate_id) = candidate_id else {
            return Ok(None);
        };

        let locked_until = now + self.lock_duration;
        let affected = conn.execute(
            "UPDATE analysis_queue
             SET status = 'running', started_at = ?1, worker_id = ?2, locked_until = ?3
             WHERE id = ?4 AND status = 'pending' AND (locked_until IS NULL OR locked_until < ?1)",
            params![to_rfc3339(now), worker_id, to_rfc3339(locked_until), candidate_id],
        )?;

        if affected == 0 {
            // Another worker raced us and won; do not retry within this call.
            tracing::trace!(worker_id, candidate_id, "lost dequeue race");
            return Ok(None);
        }

        tracing::debug!(worker_id, job_id = %candidate_id, "dequeued job");
        get_job(&conn, &candidate_id)
    }

    pub fn complete(&self, id: &JobId, _node_id: &sg_core::NodeId) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let now = self.clock.utc_now();
        conn.execute(
            "UPDATE analysis_queue
             SET status = 'completed', completed_at = ?1, worker_id = NULL, locked_until = NULL
             WHERE id = ?2",
            params![to_rfc3339(now), id.as_str()],
        )?;
        Ok(())
    }

    /// Retryable failure: bump `retryCount`, re-queue under the `2^retryCount`-minutes
    /// lease (the pre-increment retry count, so the 1st/2nd/3rd failures land
    /// +1/+2/+4 minutes out), or transition to permanently failed once the
    /// retry budget is exhausted. `category_max_retries` is the error
    /// classifier's own per-category cap (§4.4); the effective budget is
    /// `min(job.maxRetries, category_max_retries)`, matching
    /// `classifyErrorWithContext`. Returns `true` iff the job reached the
    /// terminal `failed` state on this call.
    pub fn fail(&self, id: &JobId, error: &ErrorRecord, category_max_retries: u32) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let now = self.clock.utc_now();
        let error_json = error.format_for_storage()?;

        let (retry_count, job_max_retries): (u32, u32) = conn.query_row(
            "SELECT retry_count, max_retries FROM analysis_queue WHERE id = ?1",
            params![id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let max_retries = job_max_retries.min(category_max_retries);

        if retry_count < max_retries {
            let new_retry_count = retry_count + 1;
            let delay_minutes = 2i64.pow(retry_count);
            let locked_until = now + chrono::Duration::minutes(delay_minutes);
            conn.execute(
                "UPDATE analysis_queue
                 SET status = 'pending', retry_count = ?1, worker_id = NULL,
                     locked_until = ?2, last_error = ?3
                 WHERE id = ?4",
                params![new_retry_count, to_rfc3339(locked_until), error_json, id.as_str()],
            )?;
            Ok(false)
        } else {
            conn.execute(
                "UPDATE analysis_queue
                 SET status = 'failed', worker_id = NULL, locked_until = NULL, last_error = ?1
                 WHERE id = ?2",
                params![error_json, id.as_str()],
            )?;
            Ok(true)
        }
    }

    pub fn fail_permanently(&self, id: &JobId, error: &ErrorRecord) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let error_json = error.format_for_storage()?;
        conn.execute(
            "UPDATE analysis_queue
             SET status = 'failed', worker_id = NULL, locked_until = NULL, last_error = ?1
             WHERE id = ?2",
            params![error_json, id.as_str()],
        )?;
        tracing::warn!(job_id = %id, reason = %error.reason, "job failed permanently");
        Ok(())
    }

    pub fn retry_job(&self, id: &JobId) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let affected = conn.execute(
            "UPDATE analysis_queue
             SET status = 'pending', retry_count = 0, last_error = NULL,
                 started_at = NULL, completed_at = NULL, worker_id = NULL, locked_until = NULL
             WHERE id = ?1 AND status = 'failed'",
            params![id.as_str()],
        )?;
        Ok(affected > 0)
    }

    pub fn cancel_job(&self, id: &JobId) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let affected = conn.execute(
            "DELETE FROM analysis_queue WHERE id = ?1 AND status = 'pending'",
            params![id.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Recover crashed workers: expired leases only.
    pub fn release_stale(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let now = self.clock.utc_now();
        self.release_running(&conn, Some(now))
    }

    /// Recover from an unclean shutdown: every running row regardless of lease time.
    pub fn release_all_running(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        self.release_running(&conn, None)
    }

    fn release_running(&self, conn: &Connection, only_expired_before: Option<DateTime<Utc>>) -> Result<u64, StorageError> {
        let mut query = "SELECT id, retry_count, max_retries FROM analysis_queue WHERE status = 'running'".to_string();
        if only_expired_before.is_some() {
            query.push_str(" AND locked_until < ?1");
        }

        let mut stmt = conn.prepare(&query)?;
        let rows: Vec<(String, u32, u32)> = if let Some(now) = only_expired_before {
            stmt.query_map(params![to_rfc3339(now)], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<_, _>>()?
        } else {
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<_, _>>()?
        };
        drop(stmt);

        let mut count = 0u64;
        for (id, retry_count, max_retries) in rows {
            let new_retry_count = retry_count + 1;
            if retry_count >= max_retries {
                let error = ErrorRecord::new(
                    self.clock.utc_now(),
                    sg_core::ErrorCategory::Transient,
                    "Stale lease recovery",
                    "max retries exceeded after stale lock recovery",
                    None,
                );
                conn.execute(
                    "UPDATE analysis_queue
                     SET status = 'failed', retry_count = ?1, worker_id = NULL, locked_until = NULL, last_error = ?2
                     WHERE id = ?3",
                    params![new_retry_count, error.format_for_storage()?, id],
                )?;
            } else {
                conn.execute(
                    "UPDATE analysis_queue
                     SET status = 'pending', retry_count = ?1, worker_id = NULL, locked_until = NULL
                     WHERE id = ?2",
                    params![new_retry_count, id],
                )?;
            }
            count += 1;
        }
        if count > 0 {
            tracing::info!(recovered = count, "recovered stale or running jobs");
        }
        Ok(count)
    }

    /// NULLs must be matched by `IS NULL`, not equality, on both segment bounds.
    pub fn has_existing_job(
        &self,
        session_file: &str,
        segment_start: Option<&str>,
        segment_end: Option<&str>,
    ) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analysis_queue
             WHERE session_file = ?1
               AND (segment_start IS ?2)
               AND (segment_end IS ?3)
               AND status IN ('pending', 'running')",
            params![session_file, segment_start, segment_end],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_job(&self, id: &JobId) -> Result<Option<Job>, StorageError> {
        let conn = self.conn.lock();
        get_job(&conn, id.as_str())
    }

    pub fn get_pending_jobs(&self, session_file: Option<&str>, limit: Option<u64>) -> Result<Vec<Job>, StorageError> {
        let conn = self.conn.lock();
        list_jobs(
            &conn,
            "status = 'pending'",
            session_file,
            limit,
            "priority ASC, queued_at ASC",
        )
    }

    pub fn get_running_jobs(&self) -> Result<Vec<Job>, StorageError> {
        let conn = self.conn.lock();
        list_jobs(&conn, "status = 'running'", None, None, "queued_at ASC")
    }

    pub fn get_failed_jobs(&self, limit: Option<u64>) -> Result<Vec<Job>, StorageError> {
        let conn = self.conn.lock();
        list_jobs(&conn, "status = 'failed'", None, limit, "queued_at DESC")
    }

    pub fn get_jobs_for_session(&self, session_file: &str) -> Result<Vec<Job>, StorageError> {
        let conn = self.conn.lock();
        list_jobs(&conn, "1 = 1", Some(session_file), None, "queued_at ASC")
    }

    pub fn get_job_counts(&self) -> Result<JobCounts, StorageError> {
        let conn = self.conn.lock();
        let mut counts = JobCounts::default();
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM analysis_queue GROUP BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        for row in rows {
            let (status, n) = row?;
            match status.as_str() {
                "pending" => counts.pending = n,
                "running" => counts.running = n,
                "completed" => counts.completed = n,
                "failed" => counts.failed = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    pub fn get_stats(&self) -> Result<QueueStats, StorageError> {
        let counts = self.get_job_counts()?;
        let conn = self.conn.lock();
        let total = counts.pending + counts.running + counts.completed + counts.failed;
        let avg_retry_count: f64 = conn
            .query_row("SELECT AVG(retry_count) FROM analysis_queue", [], |row| row.get(0))
            .unwrap_or(0.0);
        Ok(QueueStats {
            total,
            counts,
            avg_retry_count,
        })
    }

    pub fn get_daily_stats(&self, days: u32) -> Result<Vec<DailyStats>, StorageError> {
        let conn = self.conn.lock();
        let cutoff = self.clock.utc_now() - chrono::Duration::days(days as i64);
        let mut stmt = conn.prepare(
            "SELECT substr(completed_at, 1, 10) AS day,
                    SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END) AS completed,
                    SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS failed
             FROM analysis_queue
             WHERE completed_at IS NOT NULL AND completed_at >= ?1
             GROUP BY day
             ORDER BY day ASC",
        )?;
        let rows = stmt.query_map(params![to_rfc3339(cutoff)], |row| {
            Ok(DailyStats {
                day: row.get(0)?,
                completed: row.get::<_, i64>(1)? as u64,
                failed: row.get::<_, i64>(2)? as u64,
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(StorageError::from)
    }

    /// `DELETE ... WHERE status IN (completed, failed) AND completed_at < ?`.
    pub fn clear_old_completed(&self, days: u32) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let cutoff = self.clock.utc_now() - chrono::Duration::days(days as i64);
        let affected = conn.execute(
            "DELETE FROM analysis_queue
             WHERE status IN ('completed', 'failed') AND completed_at < ?1",
            params![to_rfc3339(cutoff)],
        )?;
        Ok(affected as u64)
    }
}

fn insert_job(conn: &Connection, input: &JobInput, now: DateTime<Utc>) -> Result<JobId, StorageError> {
    let id = JobId::new();
    let priority = input.job_type.canonical_priority();
    let max_retries = input.max_retries.unwrap_or(Job::DEFAULT_MAX_RETRIES);
    let context_json = serde_json::to_string(&input.context)?;
    let target_node_id = input
        .context
        .get("existingNodeId")
        .or_else(|| input.context.get("nodeId"))
        .and_then(|v| v.as_str());

    conn.execute(
        "INSERT INTO analysis_queue
            (id, job_type, priority, session_file, segment_start, segment_end,
             context, target_node_id, status, queued_at, retry_count, max_retries)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, 0, ?10)",
        params![
            id.as_str(),
            input.job_type.to_string(),
            priority,
            input.session_file,
            input.segment.as_ref().and_then(|s| s.start_entry_id.clone()),
            input.segment.as_ref().and_then(|s| s.end_entry_id.clone()),
            context_json,
            target_node_id,
            to_rfc3339(now),
            max_retries,
        ],
    )?;
    Ok(id)
}

fn get_job(conn: &Connection, id: &str) -> Result<Option<Job>, StorageError> {
    conn.query_row(
        "SELECT id, job_type, priority, session_file, segment_start, segment_end, context,
                status, queued_at, started_at, completed_at, retry_count, max_retries,
                last_error, worker_id, locked_until
         FROM analysis_queue WHERE id = ?1",
        params![id],
        job_from_row,
    )
    .optional()
    .map_err(StorageError::from)
}

fn list_jobs(
    conn: &Connection,
    predicate: &str,
    session_file: Option<&str>,
    limit: Option<u64>,
    order_by: &str,
) -> Result<Vec<Job>, StorageError> {
    let mut query = format!(
        "SELECT id, job_type, priority, session_file, segment_start, segment_end, context,
                status, queued_at, started_at, completed_at, retry_count, max_retries,
                last_error, worker_id, locked_until
         FROM analysis_queue WHERE {predicate}"
    );
    if session_file.is_some() {
        query.push_str(" AND session_file = ?1");
    }
    query.push_str(&format!(" ORDER BY {order_by}"));
    if let Some(limit) = limit {
        query.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&query)?;
    let rows = if let Some(session_file) = session_file {
        stmt.query_map(params![session_file], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?
    } else {
        stmt.query_map([], job_from_row)?.collect::<Result<Vec<_>, _>>()?
    };
    Ok(rows)
}

fn job_from_row(row: &Row) -> rusqlite::Result<Job> {
    let context_json: String = row.get(6)?;
    let context: JobContext = serde_json::from_str(&context_json).unwrap_or_default();
    let last_error_json: Option<String> = row.get(13)?;
    let last_error = last_error_json.and_then(|s| ErrorRecord::parse_stored(&s).ok());
    let segment_start: Option<String> = row.get(4)?;
    let segment_end: Option<String> = row.get(5)?;

    Ok(Job {
        id: JobId::from_string(row.get::<_, String>(0)?),
        job_type: JobType::from_str(&row.get::<_, String>(1)?).unwrap_or(JobType::Initial),
        priority: row.get(2)?,
        session_file: row.get(3)?,
        segment: if segment_start.is_some() || segment_end.is_some() {
            Some(SegmentBounds {
                start_entry_id: segment_start,
                end_entry_id: segment_end,
            })
        } else {
            None
        },
        context,
        status: JobStatus::from_str(&row.get::<_, String>(7)?).unwrap_or(JobStatus::Pending),
        queued_at: parse_rfc3339(&row.get::<_, String>(8)?),
        started_at: row.get::<_, Option<String>>(9)?.map(|s| parse_rfc3339(&s)),
        completed_at: row.get::<_, Option<String>>(10)?.map(|s| parse_rfc3339(&s)),
        retry_count: row.get(11)?,
        max_retries: row.get(12)?,
        last_error,
        worker_id: row.get(14)?,
        locked_until: row.get::<_, Option<String>>(15)?.map(|s| parse_rfc3339(&s)),
    })
}

fn to_rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
