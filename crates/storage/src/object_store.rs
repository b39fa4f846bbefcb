// SPDX-License-Identifier: MIT

//! JSON object store: one immutable file per node version, keyed
//! `YYYY/MM/<node-id>-v<version>.json`. Never mutated in place.

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use sg_core::Node;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn write(&self, node: &Node, created_at: DateTime<Utc>) -> Result<(), StorageError> {
        let rel = node.object_store_path(created_at);
        let path = self.root.join(&rel);
        self.write_at(node, &path)
    }

    fn write_at(&self, node: &Node, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::ObjectStoreIo {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let json = serde_json::to_vec_pretty(node)?;
        std::fs::write(path, json).map_err(|e| StorageError::ObjectStoreIo {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn read(&self, node: &Node, created_at: DateTime<Utc>) -> Result<Node, StorageError> {
        let rel = node.object_store_path(created_at);
        let path = self.root.join(&rel);
        let raw = std::fs::read(&path).map_err(|e| StorageError::ObjectStoreIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[cfg(test)]
#[path = "object_store_tests.rs"]
mod tests;
