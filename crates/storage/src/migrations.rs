// SPDX-License-Identifier: MIT

//! SQL schema. Run once per connection at store construction.

use crate::error::StorageError;
use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS analysis_queue (
    id              TEXT PRIMARY KEY,
    job_type        TEXT NOT NULL,
    priority        INTEGER NOT NULL,
    session_file    TEXT NOT NULL,
    segment_start   TEXT,
    segment_end     TEXT,
    context         TEXT NOT NULL,
    target_node_id  TEXT,
    status          TEXT NOT NULL,
    queued_at       TEXT NOT NULL,
    started_at      TEXT,
    completed_at    TEXT,
    retry_count     INTEGER NOT NULL DEFAULT 0,
    max_retries     INTEGER NOT NULL,
    last_error      TEXT,
    worker_id       TEXT,
    locked_until    TEXT
);

CREATE INDEX IF NOT EXISTS idx_queue_dequeue
    ON analysis_queue (status, priority, queued_at);

CREATE INDEX IF NOT EXISTS idx_queue_session
    ON analysis_queue (session_file, segment_start, segment_end, status);

CREATE TABLE IF NOT EXISTS nodes (
    id              TEXT NOT NULL,
    version         INTEGER NOT NULL,
    project         TEXT NOT NULL,
    session_file    TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    data            TEXT NOT NULL,
    PRIMARY KEY (id, version)
);

CREATE INDEX IF NOT EXISTS idx_nodes_project ON nodes (project, created_at);

CREATE TABLE IF NOT EXISTS edges (
    id          TEXT PRIMARY KEY,
    from_node   TEXT NOT NULL,
    to_node     TEXT NOT NULL,
    edge_type   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON edges (from_node);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges (to_node);

-- Auxiliary tables declared for collaborators; not populated by the core.
CREATE TABLE IF NOT EXISTS lessons (
    id          TEXT PRIMARY KEY,
    node_id     TEXT NOT NULL,
    scope       TEXT NOT NULL,
    text        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS model_quirks (
    id          TEXT PRIMARY KEY,
    node_id     TEXT NOT NULL,
    text        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tool_errors (
    id          TEXT PRIMARY KEY,
    node_id     TEXT NOT NULL,
    text        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS aggregated_insights (
    id          TEXT PRIMARY KEY,
    project     TEXT NOT NULL,
    text        TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";

/// Queue and NodeStore each open their own connection onto the same database
/// file, and the worker pool dequeues/completes concurrently, so without a
/// busy timeout a second writer hits `SQLITE_BUSY` immediately instead of
/// waiting for the lock to clear. WAL mode lets readers proceed during a
/// writer's transaction.
pub fn run(conn: &Connection) -> Result<(), StorageError> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
