// SPDX-License-Identifier: MIT

//! Events pushed out of the watcher over a `tokio::sync::mpsc` channel.
//!
//! A push model rather than an in-language observer list: ordering per file
//! is preserved because only that file's own debounce/idle task ever sends
//! for it, drop-after-stop falls out of dropping the sender on `stop()`, and
//! a panic handling one file's event cannot affect another's because each
//! file is driven by its own tokio task.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum WatcherEvent {
    New(PathBuf),
    Change(PathBuf),
    Remove(PathBuf),
    Idle(PathBuf),
    Ready,
    Error(String),
}
