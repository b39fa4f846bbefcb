// SPDX-License-Identifier: MIT

//! Depth-limited recursive discovery of `.jsonl` session files under a watch root.

use std::path::{Path, PathBuf};

/// A root directory the watcher observes.
#[derive(Debug, Clone)]
pub struct WatchRoot {
    pub path: PathBuf,
    pub is_spoke: bool,
}

impl WatchRoot {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_spoke: false,
        }
    }

    pub fn spoke(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_spoke: true,
        }
    }
}

/// Discover every `.jsonl` file under `root`, recursing at most `max_depth` levels.
pub fn discover_jsonl_files(root: &Path, max_depth: u32) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, max_depth, &mut found);
    found
}

fn walk(dir: &Path, remaining_depth: u32, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if remaining_depth > 0 {
                walk(&path, remaining_depth - 1, found);
            }
        } else if is_jsonl(&path) {
            found.push(path);
        }
    }
}

pub fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_jsonl_files_within_depth() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.jsonl"), "").expect("write a");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir nested");
        std::fs::write(dir.path().join("nested/b.jsonl"), "").expect("write b");
        std::fs::write(dir.path().join("ignore.txt"), "").expect("write ignore");

        let mut found = discover_jsonl_files(dir.path(), 2);
        found.sort();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn does_not_recurse_past_max_depth() {
        let dir = tempdir().expect("tempdir");
        let deep = dir.path().join("a/b/c");
        std::fs::create_dir_all(&deep).expect("mkdir deep");
        std::fs::write(deep.join("deep.jsonl"), "").expect("write deep");

        let found = discover_jsonl_files(dir.path(), 1);
        assert!(found.is_empty());
    }
}
