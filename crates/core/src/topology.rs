// SPDX-License-Identifier: MIT

//! Registered spoke roots: directories synced in from another machine.
//!
//! Shared between the watcher (which needs the longer spoke write-stability
//! threshold) and the worker (which attributes a node's `computer` field to
//! the owning spoke). Resolving the open question on precedence: the
//! longest-matching registered spoke root wins; the local hostname is used
//! only when no spoke root prefixes the path.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SpokeRoot {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    spokes: Vec<SpokeRoot>,
}

impl Topology {
    pub fn new(spokes: Vec<SpokeRoot>) -> Self {
        Self { spokes }
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, name: impl Into<String>) {
        self.spokes.push(SpokeRoot {
            path: path.into(),
            name: name.into(),
        });
    }

    /// The longest-prefix-matching spoke root for `path`, if any.
    pub fn spoke_for(&self, path: &Path) -> Option<&SpokeRoot> {
        self.spokes
            .iter()
            .filter(|s| path.starts_with(&s.path))
            .max_by_key(|s| s.path.as_os_str().len())
    }

    pub fn is_spoke_path(&self, path: &Path) -> bool {
        self.spoke_for(path).is_some()
    }

    /// `getComputerFromPath`: the owning spoke's name, or the local hostname.
    pub fn computer_for_path(&self, path: &Path, local_hostname: &str) -> String {
        self.spoke_for(path)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| local_hostname.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_spoke_registered_falls_back_to_hostname() {
        let topology = Topology::default();
        assert_eq!(
            topology.computer_for_path(Path::new("/home/u/sessions/a.jsonl"), "laptop"),
            "laptop"
        );
    }

    #[test]
    fn path_under_spoke_root_uses_spoke_name() {
        let mut topology = Topology::default();
        topology.register("/spoke", "desktop");
        assert_eq!(
            topology.computer_for_path(Path::new("/spoke/x.jsonl"), "laptop"),
            "desktop"
        );
    }

    #[test]
    fn longest_prefix_spoke_wins_on_nested_registrations() {
        let mut topology = Topology::default();
        topology.register("/spoke", "outer");
        topology.register("/spoke/nested", "inner");
        assert_eq!(
            topology.computer_for_path(Path::new("/spoke/nested/x.jsonl"), "laptop"),
            "inner"
        );
        assert_eq!(
            topology.computer_for_path(Path::new("/spoke/other/x.jsonl"), "laptop"),
            "outer"
        );
    }
}
