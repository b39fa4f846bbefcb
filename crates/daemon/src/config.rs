// SPDX-License-Identifier: MIT

//! Builds the typed `sg_core::config::Config` tree from environment
//! variables, falling back to the hardcoded defaults in `sg_core::config`.

use sg_core::config::Config;

/// Construct the root config, applying any environment overrides on top of
/// `Config::default()`.
pub fn load() -> Config {
    let mut config = Config::default();
    if let Some(timeout) = crate::env::analyzer_timeout() {
        config.worker.analyzer_timeout = timeout;
    }
    config
}
