// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Tor Supervisor (spec §4.4): launches, stops, and restarts Tor inside the
//! namespace as the unprivileged Tor user, since no system service manager
//! can supervise a process whose network context is a foreign namespace.

use anon_net::NamespaceManager;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::TorError;

const LIVENESS_DELAY: Duration = Duration::from_secs(2);
const STOP_GRACE: Duration = Duration::from_secs(5);

pub struct TorSupervisor {
    namespace: NamespaceManager,
    tor_user: String,
    data_dir: PathBuf,
    torrc_path: PathBuf,
    pid_path: PathBuf,
}

impl TorSupervisor {
    pub fn new(
        namespace: NamespaceManager,
        tor_user: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        torrc_path: impl Into<PathBuf>,
        pid_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            namespace,
            tor_user: tor_user.into(),
            data_dir: data_dir.into(),
            torrc_path: torrc_path.into(),
            pid_path: pid_path.into(),
        }
    }

    /// Validate the rendered torrc via a dry-run invocation, as required
    /// before any configuration update is accepted (spec §4.4).
    pub async fn validate_config(&self) -> Result<(), TorError> {
        anon_shell::run_checked(
            "tor",
            &["-f", &self.torrc_path.to_string_lossy(), "--verify-config"],
        )
        .await
        .map_err(TorError::from)?;
        Ok(())
    }

    pub async fn start(&self) -> Result<(), TorError> {
        self.kill_prior_managed_process().await;
        self.stop_system_tor_service().await;
        self.remove_stale_lock_file().await;
        self.ensure_data_dir_ownership().await?;
        self.validate_config().await?;

        self.namespace
            .exec(
                "sudo",
                &[
                    "-u",
                    &self.tor_user,
                    "tor",
                    "-f",
                    &self.torrc_path.to_string_lossy(),
                ],
            )
            .await
            .map_err(|e| TorError::Step { step: "tor_start", reason: e.to_string() })?;

        tokio::time::sleep(LIVENESS_DELAY).await;

        let pid = self.find_tor_pid().await.ok_or_else(|| TorError::Step {
            step: "tor_start",
            reason: "tor did not report a pid after the liveness delay".to_string(),
        })?;
        self.write_pid_file(pid).await?;

        info!(pid, "tor supervisor started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), TorError> {
        if let Some(pid) = self.read_pid_file().await {
            anon_shell::run_best_effort("kill", &["-TERM", &pid.to_string()]).await;
        }
        self.terminate_named_process("TERM").await;

        tokio::time::sleep(STOP_GRACE).await;

        if let Some(pid) = self.read_pid_file().await {
            if self.signal_zero(pid).await {
                anon_shell::run_best_effort("kill", &["-KILL", &pid.to_string()]).await;
            }
        }
        self.terminate_named_process("KILL").await;

        let _ = tokio::fs::remove_file(&self.pid_path).await;
        Ok(())
    }

    pub async fn restart(&self) -> Result<(), TorError> {
        self.stop().await?;
        self.start().await
    }

    pub async fn is_running(&self) -> bool {
        match self.read_pid_file().await {
            Some(pid) => self.signal_zero(pid).await,
            None => false,
        }
    }

    async fn kill_prior_managed_process(&self) {
        if let Some(pid) = self.read_pid_file().await {
            anon_shell::run_best_effort("kill", &["-KILL", &pid.to_string()]).await;
        }
    }

    async fn stop_system_tor_service(&self) {
        anon_shell::run_best_effort("systemctl", &["stop", "tor"]).await;
        anon_shell::run_best_effort("systemctl", &["stop", "tor@default"]).await;
    }

    async fn remove_stale_lock_file(&self) {
        let lock_path = self.data_dir.join("lock");
        let _ = tokio::fs::remove_file(&lock_path).await;
    }

    async fn ensure_data_dir_ownership(&self) -> Result<(), TorError> {
        tokio::fs::create_dir_all(&self.data_dir).await.map_err(TorError::from)?;
        anon_shell::run_checked(
            "chown",
            &["-R", &format!("{}:{}", self.tor_user, self.tor_user), &self.data_dir.to_string_lossy()],
        )
        .await
        .map_err(TorError::from)?;
        anon_shell::run_checked("chmod", &["0700", &self.data_dir.to_string_lossy()])
            .await
            .map_err(TorError::from)?;
        Ok(())
    }

    async fn terminate_named_process(&self, signal: &str) {
        let Ok(output) = anon_shell::run_checked("pgrep", &["-u", &self.tor_user, "-x", "tor"]).await else {
            return;
        };
        for pid in anon_shell::stdout_string(&output).lines() {
            anon_shell::run_best_effort("kill", &[&format!("-{signal}"), pid]).await;
        }
    }

    async fn find_tor_pid(&self) -> Option<u32> {
        let output = anon_shell::run_checked("pgrep", &["-u", &self.tor_user, "-x", "tor"]).await.ok()?;
        anon_shell::stdout_string(&output).lines().next()?.trim().parse().ok()
    }

    async fn write_pid_file(&self, pid: u32) -> Result<(), TorError> {
        tokio::fs::write(&self.pid_path, pid.to_string()).await.map_err(TorError::from)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = tokio::fs::set_permissions(&self.pid_path, perms).await;
        }
        Ok(())
    }

    async fn read_pid_file(&self) -> Option<u32> {
        let content = tokio::fs::read_to_string(&self.pid_path).await.ok()?;
        content.trim().parse().ok()
    }

    async fn signal_zero(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
        }
        #[cfg(not(unix))]
        {
            let _ = pid;
            false
        }
    }
}

/// Whether `path` is currently owned by the Tor user at mode 0700 — used by
/// the Verifier (spec §4.8) as a cheap sanity check, not by the supervisor
/// itself.
pub async fn data_dir_is_hardened(path: &Path) -> bool {
    let Ok(meta) = tokio::fs::metadata(path).await else {
        return false;
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o777 == 0o700
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pid_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = TorSupervisor::new(
            NamespaceManager::new(anon_core::NamespaceTopology::fixed(), "eth0"),
            "debian-tor",
            dir.path().join("data"),
            dir.path().join("torrc"),
            dir.path().join("tor.pid"),
        );
        supervisor.write_pid_file(4242).await.expect("write pid");
        assert_eq!(supervisor.read_pid_file().await, Some(4242));
    }

    #[tokio::test]
    async fn not_running_without_pid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = TorSupervisor::new(
            NamespaceManager::new(anon_core::NamespaceTopology::fixed(), "eth0"),
            "debian-tor",
            dir.path().join("data"),
            dir.path().join("torrc"),
            dir.path().join("tor.pid"),
        );
        assert!(!supervisor.is_running().await);
    }
}
