// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Symlink-aware capture/restore of the resolver configuration (spec §4.1,
//! scenario S1). `/etc/resolv.conf` is frequently a symlink to
//! `systemd-resolved`'s stub file on Debian-family hosts; capturing only the
//! content would lose the ability to restore the symlink itself.

use anon_core::ResolvState;
use std::path::Path;

use crate::SnapshotError;

const RESOLV_PATH: &str = "/etc/resolv.conf";

/// Capture the current resolver configuration, symlink-aware.
pub async fn capture(path: &Path) -> Result<ResolvState, SnapshotError> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if meta.file_type().is_symlink() {
        let relative_target = tokio::fs::read_link(path).await?;
        let absolute_target = tokio::fs::canonicalize(path).await.unwrap_or_else(|_| relative_target.clone());
        let content = tokio::fs::read_to_string(&absolute_target).await.unwrap_or_default();
        Ok(ResolvState::Symlink {
            absolute_target: absolute_target.to_string_lossy().to_string(),
            relative_target: relative_target.to_string_lossy().to_string(),
            content,
        })
    } else {
        let content = tokio::fs::read_to_string(path).await?;
        let immutable = is_immutable(path).await;
        Ok(ResolvState::File { content, immutable })
    }
}

/// Capture `/etc/resolv.conf` specifically.
pub async fn capture_default() -> Result<ResolvState, SnapshotError> {
    capture(Path::new(RESOLV_PATH)).await
}

/// Restore a previously captured resolver configuration.
pub async fn restore(path: &Path, state: &ResolvState) -> Result<(), SnapshotError> {
    clear_immutable(path).await;
    match state {
        ResolvState::Symlink { relative_target, content, absolute_target } => {
            // Write the target file's content back first so the link is never
            // dangling, even momentarily.
            let target_path = if absolute_target.starts_with('/') {
                std::path::PathBuf::from(absolute_target)
            } else {
                path.parent().map(|p| p.join(absolute_target)).unwrap_or_else(|| absolute_target.into())
            };
            if let Some(parent) = target_path.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            tokio::fs::write(&target_path, content).await?;

            if tokio::fs::symlink_metadata(path).await.is_ok() {
                tokio::fs::remove_file(path).await?;
            }
            #[cfg(unix)]
            tokio::fs::symlink(relative_target, path).await?;
        }
        ResolvState::File { content, immutable } => {
            if tokio::fs::symlink_metadata(path).await.is_ok() {
                tokio::fs::remove_file(path).await?;
            }
            tokio::fs::write(path, content).await?;
            if *immutable {
                set_immutable(path).await;
            }
        }
    }
    Ok(())
}

/// Restore to safe defaults: a plain file pointing at loopback, mutable.
pub async fn restore_safe_default(path: &Path) -> Result<(), SnapshotError> {
    clear_immutable(path).await;
    if tokio::fs::symlink_metadata(path).await.is_ok() {
        tokio::fs::remove_file(path).await?;
    }
    tokio::fs::write(path, "nameserver 1.1.1.1\n").await?;
    Ok(())
}

async fn is_immutable(path: &Path) -> bool {
    let Ok(out) = anon_shell::run_checked("lsattr", &[&path.to_string_lossy()]).await else {
        return false;
    };
    let text = anon_shell::stdout_string(&out);
    text.split_whitespace().next().map(|attrs| attrs.contains('i')).unwrap_or(false)
}

async fn set_immutable(path: &Path) {
    anon_shell::run_best_effort("chattr", &["+i", &path.to_string_lossy()]).await;
}

async fn clear_immutable(path: &Path) {
    anon_shell::run_best_effort("chattr", &["-i", &path.to_string_lossy()]).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn captures_and_restores_regular_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resolv.conf");
        tokio::fs::write(&path, "nameserver 8.8.8.8\n").await.expect("write");

        let captured = capture(&path).await.expect("capture");
        assert!(matches!(captured, ResolvState::File { .. }));

        tokio::fs::write(&path, "nameserver 127.0.0.1\n").await.expect("mutate");
        restore(&path, &captured).await.expect("restore");
        let content = tokio::fs::read_to_string(&path).await.expect("read back");
        assert_eq!(content, "nameserver 8.8.8.8\n");
    }

    #[tokio::test]
    async fn captures_and_restores_symlink() {
        let dir = tempdir().expect("tempdir");
        let target_dir = dir.path().join("run/systemd/resolve");
        tokio::fs::create_dir_all(&target_dir).await.expect("mkdir");
        let target = target_dir.join("stub-resolv.conf");
        tokio::fs::write(&target, "nameserver 127.0.0.53\n").await.expect("write target");

        let link = dir.path().join("resolv.conf");
        let relative = "run/systemd/resolve/stub-resolv.conf";
        #[cfg(unix)]
        tokio::fs::symlink(relative, &link).await.expect("symlink");

        let captured = capture(&link).await.expect("capture");
        assert!(matches!(captured, ResolvState::Symlink { .. }));

        // Simulate anonctl replacing it with a plain file during enable.
        tokio::fs::remove_file(&link).await.expect("remove link");
        tokio::fs::write(&link, "nameserver 127.0.0.1\n").await.expect("write plain");

        restore(&link, &captured).await.expect("restore");
        let meta = tokio::fs::symlink_metadata(&link).await.expect("meta");
        assert!(meta.file_type().is_symlink());
        let resolved = tokio::fs::read_to_string(&link).await.expect("read through link");
        assert_eq!(resolved, "nameserver 127.0.0.53\n");
    }
}
