// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! DNS Lock (spec §4.1 note, §4.5): replaces `/etc/resolv.conf` with a
//! plain file pointing at loopback and marks it immutable, so nothing on
//! the host can silently rewrite it out from under the killswitch. Prior
//! state (symlink or file) is captured separately by `anon-storage` before
//! this runs; unlocking for restore is `anon_storage::resolv::restore`.

use std::path::Path;

use crate::error::NetError;

const RESOLV_PATH: &str = "/etc/resolv.conf";

/// Lock `/etc/resolv.conf` to `nameserver 127.0.0.1`, immutable.
pub async fn lock() -> Result<(), NetError> {
    lock_path(Path::new(RESOLV_PATH)).await
}

async fn lock_path(path: &Path) -> Result<(), NetError> {
    clear_immutable(path).await;
    if tokio::fs::symlink_metadata(path).await.is_ok() {
        tokio::fs::remove_file(path).await.map_err(|e| NetError::Step {
            step: "dns_lock",
            reason: e.to_string(),
        })?;
    }
    tokio::fs::write(path, "nameserver 127.0.0.1\n").await.map_err(|e| NetError::Step {
        step: "dns_lock",
        reason: e.to_string(),
    })?;
    set_immutable(path).await;
    Ok(())
}

async fn set_immutable(path: &Path) {
    anon_shell::run_best_effort("chattr", &["+i", &path.to_string_lossy()]).await;
}

async fn clear_immutable(path: &Path) {
    anon_shell::run_best_effort("chattr", &["-i", &path.to_string_lossy()]).await;
}

/// Watchdog check (spec §4.6c): the first nameserver line begins with `127.`.
pub async fn points_at_loopback(path: &Path) -> bool {
    let Ok(content) = tokio::fs::read_to_string(path).await else {
        return false;
    };
    content
        .lines()
        .find_map(|line| line.strip_prefix("nameserver "))
        .map(|ns| ns.trim().starts_with("127."))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn lock_writes_loopback_nameserver() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resolv.conf");
        tokio::fs::write(&path, "nameserver 8.8.8.8\n").await.expect("write");

        lock_path(&path).await.expect("lock");
        let content = tokio::fs::read_to_string(&path).await.expect("read");
        assert_eq!(content, "nameserver 127.0.0.1\n");
    }

    #[tokio::test]
    async fn points_at_loopback_detects_non_loopback() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resolv.conf");
        tokio::fs::write(&path, "nameserver 8.8.8.8\n").await.expect("write");
        assert!(!points_at_loopback(&path).await);

        tokio::fs::write(&path, "nameserver 127.0.0.1\n").await.expect("write");
        assert!(points_at_loopback(&path).await);
    }
}
