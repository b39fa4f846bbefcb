// SPDX-License-Identifier: MIT

//! Edge: a directed relation between two nodes.

use crate::define_id;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

define_id! {
    /// Stable 16-hex-character edge identifier.
    pub struct EdgeId;
}

/// The relation an edge encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Branch,
    Fork,
    Resume,
    Semantic,
}

crate::simple_display!(EdgeType {
    Branch => "branch",
    Fork => "fork",
    Resume => "resume",
    Semantic => "semantic",
});

impl std::str::FromStr for EdgeType {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "branch" => Ok(EdgeType::Branch),
            "fork" => Ok(EdgeType::Fork),
            "resume" => Ok(EdgeType::Resume),
            "semantic" => Ok(EdgeType::Semantic),
            other => Err(crate::error::CoreError::InvalidEnumValue {
                field: "edge_type",
                value: other.to_string(),
            }),
        }
    }
}

impl EdgeType {
    /// Map a job's `context.boundaryType` tag to the structural edge it implies.
    pub fn from_boundary_type(boundary_type: &str) -> Option<Self> {
        match boundary_type {
            "resume" | "compaction" => Some(EdgeType::Resume),
            "fork" => Some(EdgeType::Fork),
            "branch" => Some(EdgeType::Branch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub edge_type: EdgeType,
}

#[cfg(test)]
#[path = "edge_tests.rs"]
mod tests;
