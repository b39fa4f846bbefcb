// SPDX-License-Identifier: MIT

//! Watches session transcript directories for new, changed, removed, and
//! idle `.jsonl` files.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod discovery;
mod error;
mod event;
mod session_state;
mod stability;
mod watcher;

pub use discovery::{discover_jsonl_files, is_jsonl, WatchRoot};
pub use error::WatcherError;
pub use event::WatcherEvent;
pub use session_state::{SessionPhase, SessionState};
pub use watcher::Watcher;
