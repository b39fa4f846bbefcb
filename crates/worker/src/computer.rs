// SPDX-License-Identifier: MIT

//! Computer attribution: which machine a session file was written on.

use sg_core::Topology;
use std::path::Path;

/// Longest-prefix spoke match wins; local hostname otherwise.
pub fn computer_for_path(path: &Path, topology: &Topology) -> String {
    topology.computer_for_path(path, &local_hostname())
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::SpokeRoot;
    use std::path::PathBuf;

    #[test]
    fn path_under_spoke_uses_spoke_name() {
        let topology = Topology::new(vec![SpokeRoot {
            path: PathBuf::from("/spoke"),
            name: "desktop".to_string(),
        }]);
        assert_eq!(computer_for_path(Path::new("/spoke/a.jsonl"), &topology), "desktop");
    }

    #[test]
    fn path_outside_any_spoke_falls_back_to_hostname() {
        let topology = Topology::default();
        let computer = computer_for_path(Path::new("/home/u/a.jsonl"), &topology);
        assert!(!computer.is_empty());
    }
}
