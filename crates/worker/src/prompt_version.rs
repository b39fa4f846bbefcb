// SPDX-License-Identifier: MIT

//! Stable version identifiers for the analyzer prompt file's contents,
//! recorded on each Node as `analyzerVersion` so a prompt edit is visible in
//! the graph without the worker needing to track prompt revisions itself.

use sha2::{Digest, Sha256};
use std::path::Path;

/// First 16 hex characters of the SHA-256 digest of `contents`.
pub fn version_for_contents(contents: &str) -> String {
    let digest = Sha256::digest(contents.as_bytes());
    hex_prefix(&digest, 16)
}

pub fn version_for_file(path: &Path) -> std::io::Result<String> {
    let contents = std::fs::read_to_string(path)?;
    Ok(version_for_contents(&contents))
}

fn hex_prefix(bytes: &[u8], len: usize) -> String {
    let mut s = String::with_capacity(len);
    for byte in bytes {
        if s.len() >= len {
            break;
        }
        s.push_str(&format!("{:02x}", byte));
    }
    s.truncate(len);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_contents_produce_same_version() {
        assert_eq!(version_for_contents("hello"), version_for_contents("hello"));
    }

    #[test]
    fn different_contents_produce_different_versions() {
        assert_ne!(version_for_contents("hello"), version_for_contents("world"));
    }

    #[test]
    fn version_is_sixteen_hex_chars() {
        let v = version_for_contents("anything");
        assert_eq!(v.len(), 16);
        assert!(v.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
