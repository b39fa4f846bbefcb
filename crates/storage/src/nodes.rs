// SPDX-License-Identifier: MIT

//! Node and edge persistence: SQL tables plus the JSON object store, kept in
//! sync by a single idempotent upsert.

use crate::error::StorageError;
use crate::object_store::ObjectStore;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sg_core::{Edge, EdgeId, Node, NodeId};
use std::sync::Arc;

/// Outcome of `NodeStore::upsert`: distinguishes first insertion from an update
/// so callers know whether to create structural edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: bool,
}

pub struct NodeStore {
    conn: Arc<Mutex<Connection>>,
    objects: ObjectStore,
}

impl NodeStore {
    pub fn new(conn: Arc<Mutex<Connection>>, objects: ObjectStore) -> Result<Self, StorageError> {
        {
            let guard = conn.lock();
            crate::migrations::run(&guard)?;
        }
        Ok(Self { conn, objects })
    }

    /// Write the node atomically to SQL and the JSON object store. Idempotent:
    /// re-invoking with the same (id, version) overwrites in place and reports
    /// `created = false`, so a crash-and-retry cannot double-insert.
    pub fn upsert(&self, node: &Node) -> Result<UpsertOutcome, StorageError> {
        let conn = self.conn.lock();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM nodes WHERE id = ?1 AND version = ?2",
                params![node.id.as_str(), node.version],
                |row| row.get(0),
            )
            .optional()?;
        let created = existing.is_none();

        let data = serde_json::to_string(node)?;
        let created_at = node
            .metadata
            .completed_at
            .or(node.metadata.started_at)
            .unwrap_or_else(chrono::Utc::now);

        conn.execute(
            "INSERT INTO nodes (id, version, project, session_file, created_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id, version) DO UPDATE SET data = excluded.data",
            params![
                node.id.as_str(),
                node.version,
                node.classification.project,
                node.source.session_file,
                created_at.to_rfc3339(),
                data,
            ],
        )?;

        self.objects.write(node, created_at)?;

        tracing::debug!(node_id = %node.id, version = node.version, created, "upserted node");
        Ok(UpsertOutcome { created })
    }

    pub fn get_node(&self, id: &NodeId, version: Option<u32>) -> Result<Option<Node>, StorageError> {
        let conn = self.conn.lock();
        let data: Option<String> = match version {
            Some(v) => conn
                .query_row(
                    "SELECT data FROM nodes WHERE id = ?1 AND version = ?2",
                    params![id.as_str(), v],
                    |row| row.get(0),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT data FROM nodes WHERE id = ?1 ORDER BY version DESC LIMIT 1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?,
        };
        data.map(|raw| serde_json::from_str(&raw).map_err(StorageError::from))
            .transpose()
    }

    pub fn latest_version(&self, id: &NodeId) -> Result<Option<u32>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT MAX(version) FROM nodes WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .map_err(StorageError::from)
    }

    /// Most recent prior node in `project` whose content started before `before`.
    pub fn latest_in_project_before(
        &self,
        project: &str,
        before: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Node>, StorageError> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM nodes
                 WHERE project = ?1 AND created_at < ?2
                 ORDER BY created_at DESC LIMIT 1",
                params![project, before.to_rfc3339()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|raw| serde_json::from_str(&raw).map_err(StorageError::from))
            .transpose()
    }

    pub fn insert_edge(&self, edge: &Edge) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO edges (id, from_node, to_node, edge_type) VALUES (?1, ?2, ?3, ?4)",
            params![
                edge.id.as_str(),
                edge.from_node.as_str(),
                edge.to_node.as_str(),
                edge.edge_type.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn edges_for_node(&self, node_id: &NodeId) -> Result<Vec<Edge>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, from_node, to_node, edge_type FROM edges WHERE from_node = ?1 OR to_node = ?1",
        )?;
        let rows = stmt.query_map(params![node_id.as_str()], |row| {
            let edge_type: String = row.get(3)?;
            Ok(Edge {
                id: EdgeId::from_string(row.get::<_, String>(0)?),
                from_node: NodeId::from_string(row.get::<_, String>(1)?),
                to_node: NodeId::from_string(row.get::<_, String>(2)?),
                edge_type: edge_type.parse().unwrap_or(sg_core::EdgeType::Semantic),
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(StorageError::from)
    }
}

#[cfg(test)]
#[path = "nodes_tests.rs"]
mod tests;
