// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Configuration root and well-known file layout (spec §6).
//!
//! Every well-known path is resolved from a single root directory rather
//! than scattered across constants. anonctl is host-privileged rather
//! than per-user, so the root defaults to `/etc/anonctl` and is
//! overridable via `ANONCTL_ROOT` (used by tests and by non-root dry
//! runs).

use std::path::PathBuf;

/// All well-known paths under the configuration root.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory, mode 0700 (spec §6).
    pub root: PathBuf,
    pub state_path: PathBuf,
    pub lock_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub activity_log: PathBuf,
    pub security_log: PathBuf,
    pub alert_fifo: PathBuf,
    pub torrc_path: PathBuf,
    pub proxychains_path: PathBuf,
}

impl Paths {
    /// Resolve paths from `ANONCTL_ROOT` if set, else `/etc/anonctl`.
    pub fn resolve() -> Self {
        let root = std::env::var_os("ANONCTL_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/anonctl"));
        Self::under(root)
    }

    pub fn under(root: PathBuf) -> Self {
        Self {
            state_path: root.join("state"),
            lock_path: root.join("anonctl.lock"),
            snapshot_dir: root.join("snapshots"),
            activity_log: root.join("logs").join("activity.log"),
            security_log: root.join("logs").join("security.log"),
            alert_fifo: root.join("watchdog.alerts"),
            torrc_path: root.join("torrc"),
            proxychains_path: root.join("proxychains.conf"),
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_derives_all_paths_from_root() {
        let paths = Paths::under(PathBuf::from("/tmp/anonctl-test"));
        assert_eq!(paths.state_path, PathBuf::from("/tmp/anonctl-test/state"));
        assert_eq!(paths.lock_path, PathBuf::from("/tmp/anonctl-test/anonctl.lock"));
        assert_eq!(paths.snapshot_dir, PathBuf::from("/tmp/anonctl-test/snapshots"));
    }
}
