// SPDX-License-Identifier: MIT

//! Daemon lifecycle: paths, PID/lock file acquisition, and clean shutdown.

use fs2::FileExt;
use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Root paths the daemon reads and writes, all rooted under one state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub db_path: PathBuf,
    pub objects_path: PathBuf,
}

impl Paths {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            db_path: state_dir.join("sessiongraph.db"),
            objects_path: state_dir.join("objects"),
            state_dir,
        }
    }
}

/// Holds the exclusive lock on `lock_path` for the process lifetime. The OS
/// releases the advisory lock when the process exits (cleanly or not), which
/// doubles as the "is the named process live" check without a separate
/// PID-liveness syscall.
pub struct LockGuard {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

/// Acquire the daemon's exclusive lock, refusing to start if another live
/// daemon already holds it.
pub fn acquire_lock(paths: &Paths) -> Result<LockGuard, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    Ok(LockGuard {
        file: lock_file,
        lock_path: paths.lock_path.clone(),
    })
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_acquisition_fails_while_first_is_held() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = Paths::new(dir.path().to_path_buf());

        let guard = acquire_lock(&paths).expect("first lock acquired");
        let second = acquire_lock(&paths);
        assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

        drop(guard);
        assert!(!paths.lock_path.exists());

        acquire_lock(&paths).expect("lock acquired again after release");
    }
}
