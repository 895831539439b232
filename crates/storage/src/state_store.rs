// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Atomic persistence of [`anon_core::RuntimeState`] (spec §3, §6).
//!
//! Write is write-temp-then-rename: the content lands fully formed in a
//! sibling `.tmp` file before a single `rename(2)` swaps it into place, so
//! a reader never observes a partially written state file. File
//! permissions are owner read/write only (mode 0600).

use anon_core::RuntimeState;
use std::path::{Path, PathBuf};

use crate::StateError;

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the state file, returning defaults if it does not exist yet.
    /// Invalid lines/keys are silently ignored per `RuntimeState::from_lines`.
    pub fn load(&self) -> Result<RuntimeState, StateError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(RuntimeState::from_lines(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RuntimeState::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically persist `state`, mode 0600.
    pub fn save(&self, state: &RuntimeState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(&self.path);
        write_atomic(&tmp, &self.path, state.to_lines().as_bytes())?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = tmp.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp.set_file_name(format!("{}.tmp", file_name.to_string_lossy()));
    tmp
}

#[cfg(unix)]
fn write_atomic(tmp: &Path, dest: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    {
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(tmp)?;
        std::io::Write::write_all(&mut f, content)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, dest)
}

#[cfg(not(unix))]
fn write_atomic(tmp: &Path, dest: &Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(tmp, content)?;
    std::fs::rename(tmp, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anon_core::{FirewallBackend, Mode};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("state"));
        let state = store.load().expect("load");
        assert_eq!(state, RuntimeState::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("state"));
        let mut state = RuntimeState::default();
        state.anonymity_active = true;
        state.mode = Mode::Extreme;
        state.firewall_backend = FirewallBackend::Modern;
        store.save(&state).expect("save");

        let reloaded = store.load().expect("load");
        assert_eq!(state, reloaded);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state");
        let store = StateStore::new(&path);
        store.save(&RuntimeState::default()).expect("save");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("state"));
        store.save(&RuntimeState::default()).expect("save");
        let tmp = dir.path().join("state.tmp");
        assert!(!tmp.exists());
    }
}
