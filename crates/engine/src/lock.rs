// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Lock & Lifecycle (spec §4, §5): a single PID file, held with an
//! advisory `flock`, guards the system lock. A stale entry (recorded pid
//! no longer live) is reaped rather than treated as contention, per spec
//! §8 scenario S5.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::EngineError;

/// Holds the process lock for the duration of one anonctl invocation.
/// Dropping it releases the advisory lock; the pid file itself is removed
/// explicitly by [`ProcessLock::release`] on the clean-exit path.
pub struct ProcessLock {
    path: PathBuf,
    file: File,
}

impl ProcessLock {
    /// Acquire the lock at `path`, reaping a stale holder first.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        reap_if_stale(&path);

        let file = OpenOptions::new().write(true).create(true).truncate(false).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(_) => {
                let held_by = std::fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(0);
                return Err(EngineError::LockFailed { held_by });
            }
        }

        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        info!(path = %path.display(), pid = std::process::id(), "acquired process lock");
        Ok(Self { path, file })
    }

    /// Release the lock and remove the pid file (normal exit path).
    pub fn release(self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// If `path` names a pid no longer live, remove it so a fresh invocation
/// doesn't spuriously see contention (spec §8 property 5).
fn reap_if_stale(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    let Some(pid) = content.trim().parse::<i32>().ok() else {
        let _ = std::fs::remove_file(path);
        return;
    };

    let alive = is_live(pid);
    if !alive {
        warn!(pid, path = %path.display(), "reaping stale lock file");
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(unix)]
fn is_live(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn is_live(_pid: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquires_and_releases() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("anonctl.lock");
        let lock = ProcessLock::acquire(&path).expect("acquire");
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn stale_pid_is_reaped_not_treated_as_contention() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("anonctl.lock");
        std::fs::write(&path, "999999999\n").expect("write stale pid");

        let lock = ProcessLock::acquire(&path).expect("acquire should reap stale lock");
        lock.release();
    }

    #[test]
    fn second_acquire_while_held_fails_with_contention() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("anonctl.lock");
        let first = ProcessLock::acquire(&path).expect("first acquire");

        let second = ProcessLock::acquire(&path);
        assert!(matches!(second, Err(EngineError::LockFailed { .. })));

        first.release();
    }
}
