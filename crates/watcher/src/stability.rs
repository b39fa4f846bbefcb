// SPDX-License-Identifier: MIT

//! Write-finish stability threshold selection: spoke roots tolerate
//! network-mirrored writes and so get a longer quiet period than local ones.

use sg_core::config::WatcherConfig;
use sg_core::Topology;
use std::path::Path;
use std::time::Duration;

pub fn threshold_for(path: &Path, topology: &Topology, config: &WatcherConfig) -> Duration {
    if topology.is_spoke_path(path) {
        config.stability_threshold_spoke
    } else {
        config.stability_threshold_local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::topology::Topology;

    #[test]
    fn spoke_path_uses_spoke_threshold() {
        let mut topology = Topology::default();
        topology.register("/spoke", "desktop");
        let config = WatcherConfig::default();
        assert_eq!(
            threshold_for(Path::new("/spoke/x.jsonl"), &topology, &config),
            config.stability_threshold_spoke
        );
    }

    #[test]
    fn local_path_uses_local_threshold() {
        let topology = Topology::default();
        let config = WatcherConfig::default();
        assert_eq!(
            threshold_for(Path::new("/home/u/x.jsonl"), &topology, &config),
            config.stability_threshold_local
        );
    }
}
