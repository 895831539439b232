// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Atomic, symlink-aware backup and restore of host state (spec §4.1, C4).
//!
//! Layout under the snapshot directory (spec §6):
//! `<name>/{firewall/…, sysctl/<flattened-key>.val, resolv/{kind,content,…},
//! systemd/<svc>.{enabled,active}, network/{nm_active,iface}, .complete}`.
//!
//! One small file per captured fact rather than a single serialized blob,
//! so a partial capture failure never corrupts unrelated fields — the
//! layout spec §6 prescribes.

use anon_core::{FirewallBackend, ResolvState, ServiceRecord, ServiceState, ServiceStatus, Snapshot};
use anon_core::snapshot::FirewallBlob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{resolv, safe_defaults, SnapshotError};

const RESOLV_PATH: &str = "/etc/resolv.conf";
const MARKER: &str = ".complete";

/// The fixed sysctl hardening matrix (spec §6), excluding the IPv6 keys
/// which are restored as a distinct step ("IPv6 re-enable") per spec §4.1's
/// fixed restore order.
pub const SYSCTL_KEYS: &[&str] = &[
    "kernel/kptr_restrict",
    "kernel/dmesg_restrict",
    "kernel/unprivileged_bpf_disabled",
    "net/core/bpf_jit_harden",
    "net/ipv4/tcp_timestamps",
    "net/ipv4/icmp_echo_ignore_all",
    "net/ipv4/conf/all/accept_redirects",
    "net/ipv4/conf/default/accept_redirects",
    "net/ipv6/conf/all/accept_redirects",
    "net/ipv6/conf/default/accept_redirects",
    "net/ipv4/conf/all/accept_source_route",
    "net/ipv4/conf/default/accept_source_route",
    "net/ipv6/conf/all/accept_source_route",
    "net/ipv6/conf/default/accept_source_route",
    "net/ipv4/tcp_syncookies",
    "net/ipv4/conf/all/rp_filter",
    "net/ipv4/conf/default/rp_filter",
    "net/ipv4/conf/all/send_redirects",
    "net/ipv4/conf/default/send_redirects",
    "net/ipv4/conf/all/log_martians",
    "net/ipv4/conf/default/log_martians",
];

/// The IPv6-disable keys, restored separately (spec §4.1 restore order).
pub const IPV6_KEYS: &[&str] = &[
    "net/ipv6/conf/all/disable_ipv6",
    "net/ipv6/conf/default/disable_ipv6",
    "net/ipv6/conf/all/accept_ra",
    "net/ipv6/conf/default/accept_ra",
    "net/ipv6/conf/all/autoconf",
    "net/ipv6/conf/default/autoconf",
];

/// Parameters needed to capture a snapshot; supplied by the caller
/// (the Orchestrator) so this crate never needs to depend on `anon-probe`.
pub struct SnapshotCapture {
    pub firewall_backend: FirewallBackend,
    pub service_names: Vec<String>,
    pub iface_name: String,
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn staging_dir(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.staging"))
    }

    fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.snapshot_dir(name).join(MARKER).exists()
    }

    /// Capture system state into `<name>`. No-op if `name == "initial"` and a
    /// valid snapshot under that name already exists (spec §4.1).
    pub async fn save(&self, name: &str, capture: &SnapshotCapture) -> Result<(), SnapshotError> {
        if name == "initial" && self.is_valid(name) {
            info!("initial snapshot already present; save is a no-op");
            return Ok(());
        }

        let staging = self.staging_dir(name);
        if staging.exists() {
            tokio::fs::remove_dir_all(&staging).await?;
        }
        for sub in ["sysctl", "resolv", "systemd", "network", "firewall"] {
            tokio::fs::create_dir_all(staging.join(sub)).await?;
        }

        self.capture_sysctl(&staging, SYSCTL_KEYS).await?;
        self.capture_sysctl(&staging, IPV6_KEYS).await?;
        self.capture_resolv(&staging).await?;
        self.capture_firewall(&staging, capture.firewall_backend).await?;
        self.capture_services(&staging, &capture.service_names).await?;
        self.capture_network(&staging, &capture.iface_name).await?;

        // Completion marker last, per spec §4.1 invariant.
        tokio::fs::write(staging.join(MARKER), b"").await?;

        self.commit_staging(name, &staging).await?;
        info!(name, "snapshot saved");
        Ok(())
    }

    /// Rename `staging` into place as `<name>`, removing any prior `<name>`.
    ///
    /// `rename(2)` cannot atomically replace a non-empty directory, so the
    /// swap is done in two renames, each individually atomic: the old
    /// snapshot (if any) is moved aside, the staged one installed, then the
    /// old one is deleted. A reader never observes a missing `<name>`.
    async fn commit_staging(&self, name: &str, staging: &Path) -> Result<(), SnapshotError> {
        let dest = self.snapshot_dir(name);
        let displaced = self.dir.join(format!("{name}.displaced"));
        if displaced.exists() {
            tokio::fs::remove_dir_all(&displaced).await?;
        }
        if dest.exists() {
            tokio::fs::rename(&dest, &displaced).await?;
        }
        tokio::fs::rename(staging, &dest).await?;
        if displaced.exists() {
            tokio::fs::remove_dir_all(&displaced).await?;
        }
        Ok(())
    }

    async fn capture_sysctl(&self, staging: &Path, keys: &[&str]) -> Result<(), SnapshotError> {
        for key in keys {
            let path = format!("/proc/sys/{key}");
            let flattened = key.replace('/', ".");
            let value = match tokio::time::timeout(anon_shell::DEFAULT_TIMEOUT, tokio::fs::read_to_string(&path)).await
            {
                Ok(Ok(v)) => v.trim().to_string(),
                _ => anon_core::snapshot::UNKNOWN.to_string(),
            };
            tokio::fs::write(staging.join("sysctl").join(format!("{flattened}.val")), value).await?;
        }
        Ok(())
    }

    async fn capture_resolv(&self, staging: &Path) -> Result<(), SnapshotError> {
        let state = match tokio::time::timeout(anon_shell::DEFAULT_TIMEOUT, resolv::capture_default()).await {
            Ok(Ok(s)) => s,
            _ => ResolvState::File { content: String::new(), immutable: false },
        };
        let dir = staging.join("resolv");
        match &state {
            ResolvState::Symlink { absolute_target, relative_target, content } => {
                tokio::fs::write(dir.join("kind"), "symlink").await?;
                tokio::fs::write(dir.join("absolute_target"), absolute_target).await?;
                tokio::fs::write(dir.join("relative_target"), relative_target).await?;
                tokio::fs::write(dir.join("content"), content).await?;
            }
            ResolvState::File { content, immutable } => {
                tokio::fs::write(dir.join("kind"), "file").await?;
                tokio::fs::write(dir.join("content"), content).await?;
                tokio::fs::write(dir.join("immutable"), if *immutable { "1" } else { "0" }).await?;
            }
        }
        Ok(())
    }

    async fn capture_firewall(&self, staging: &Path, backend: FirewallBackend) -> Result<(), SnapshotError> {
        let dir = staging.join("firewall");
        match backend {
            FirewallBackend::Modern => {
                let ruleset = match anon_shell::run_checked("nft", &["list", "ruleset"]).await {
                    Ok(out) => anon_shell::stdout_string(&out),
                    Err(_) => anon_core::snapshot::UNKNOWN.to_string(),
                };
                tokio::fs::write(dir.join("kind"), "modern").await?;
                tokio::fs::write(dir.join("ruleset.nft"), ruleset).await?;
            }
            FirewallBackend::Legacy | FirewallBackend::LegacyAlt => {
                let v4 = capture_stream("iptables-save", &[]).await;
                let v6 = capture_stream("ip6tables-save", &[]).await;
                let set_state = capture_stream("ipset", &["save"]).await;
                tokio::fs::write(dir.join("kind"), "legacy").await?;
                tokio::fs::write(dir.join("v4.iptables"), v4).await?;
                tokio::fs::write(dir.join("v6.iptables"), v6).await?;
                tokio::fs::write(dir.join("set_state.ipset"), set_state).await?;
            }
            FirewallBackend::Unknown => {
                tokio::fs::write(dir.join("kind"), "unknown").await?;
            }
        }
        Ok(())
    }

    async fn capture_services(&self, staging: &Path, names: &[String]) -> Result<(), SnapshotError> {
        let dir = staging.join("systemd");
        for svc in names {
            let enabled = match anon_shell::run_checked("systemctl", &["is-enabled", svc]).await {
                Ok(out) if anon_shell::stdout_string(&out).trim() == "enabled" => "enabled",
                Ok(_) => "disabled",
                Err(_) => "not-found",
            };
            let active = match anon_shell::run_checked("systemctl", &["is-active", svc]).await {
                Ok(out) if anon_shell::stdout_string(&out).trim() == "active" => "active",
                _ => "inactive",
            };
            tokio::fs::write(dir.join(format!("{svc}.enabled")), enabled).await?;
            tokio::fs::write(dir.join(format!("{svc}.active")), active).await?;
        }
        Ok(())
    }

    async fn capture_network(&self, staging: &Path, iface_name: &str) -> Result<(), SnapshotError> {
        let dir = staging.join("network");
        let nm_active = match anon_shell::run_checked("nmcli", &["-t", "-f", "NAME", "connection", "show", "--active"]).await
        {
            Ok(out) => anon_shell::stdout_string(&out).lines().next().map(|s| s.to_string()).unwrap_or_default(),
            Err(_) => String::new(),
        };
        tokio::fs::write(dir.join("nm_active"), nm_active).await?;
        tokio::fs::write(dir.join("iface"), iface_name).await?;
        Ok(())
    }

    /// Read back a previously captured (and validated) snapshot.
    pub async fn read(&self, name: &str) -> Result<Snapshot, SnapshotError> {
        if !self.is_valid(name) {
            return Err(SnapshotError::Invalid(name.to_string()));
        }
        let dir = self.snapshot_dir(name);

        let mut sysctl_values = BTreeMap::new();
        for key in SYSCTL_KEYS.iter().chain(IPV6_KEYS.iter()) {
            let flattened = key.replace('/', ".");
            let value = tokio::fs::read_to_string(dir.join("sysctl").join(format!("{flattened}.val")))
                .await
                .unwrap_or_else(|_| anon_core::snapshot::UNKNOWN.to_string());
            sysctl_values.insert((*key).to_string(), value.trim().to_string());
        }

        let resolv_dir = dir.join("resolv");
        let kind = tokio::fs::read_to_string(resolv_dir.join("kind")).await.unwrap_or_default();
        let resolv = if kind.trim() == "symlink" {
            ResolvState::Symlink {
                absolute_target: tokio::fs::read_to_string(resolv_dir.join("absolute_target")).await.unwrap_or_default(),
                relative_target: tokio::fs::read_to_string(resolv_dir.join("relative_target")).await.unwrap_or_default(),
                content: tokio::fs::read_to_string(resolv_dir.join("content")).await.unwrap_or_default(),
            }
        } else {
            ResolvState::File {
                content: tokio::fs::read_to_string(resolv_dir.join("content")).await.unwrap_or_default(),
                immutable: tokio::fs::read_to_string(resolv_dir.join("immutable")).await.unwrap_or_default().trim() == "1",
            }
        };

        let fw_dir = dir.join("firewall");
        let fw_kind = tokio::fs::read_to_string(fw_dir.join("kind")).await.unwrap_or_default();
        let firewall_ruleset = match fw_kind.trim() {
            "modern" => FirewallBlob::Modern {
                ruleset: tokio::fs::read_to_string(fw_dir.join("ruleset.nft")).await.unwrap_or_default(),
            },
            "legacy" => FirewallBlob::Legacy {
                v4: tokio::fs::read_to_string(fw_dir.join("v4.iptables")).await.unwrap_or_default(),
                v6: tokio::fs::read_to_string(fw_dir.join("v6.iptables")).await.unwrap_or_default(),
                set_state: tokio::fs::read_to_string(fw_dir.join("set_state.ipset")).await.unwrap_or_default(),
            },
            _ => FirewallBlob::Unknown,
        };

        let mut service_states = BTreeMap::new();
        if let Ok(mut entries) = tokio::fs::read_dir(dir.join("systemd")).await {
            let mut svc_names = std::collections::BTreeSet::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(svc) = name.strip_suffix(".enabled").or_else(|| name.strip_suffix(".active")) {
                    svc_names.insert(svc.to_string());
                }
            }
            for svc in svc_names {
                let enabled_raw =
                    tokio::fs::read_to_string(dir.join("systemd").join(format!("{svc}.enabled"))).await.unwrap_or_default();
                let active_raw =
                    tokio::fs::read_to_string(dir.join("systemd").join(format!("{svc}.active"))).await.unwrap_or_default();
                let enabled = match enabled_raw.trim() {
                    "enabled" => ServiceStatus::Enabled,
                    "disabled" => ServiceStatus::Disabled,
                    _ => ServiceStatus::NotFound,
                };
                let active = if active_raw.trim() == "active" { ServiceState::Active } else { ServiceState::Inactive };
                service_states.insert(svc, ServiceRecord { enabled, active });
            }
        }

        let nm_active = tokio::fs::read_to_string(dir.join("network").join("nm_active")).await.unwrap_or_default();
        let nm_active = if nm_active.trim().is_empty() { None } else { Some(nm_active.trim().to_string()) };
        let iface_name = tokio::fs::read_to_string(dir.join("network").join("iface")).await.unwrap_or_default();

        Ok(Snapshot {
            name: name.to_string(),
            firewall_ruleset,
            sysctl_values,
            resolv,
            service_states,
            nm_active,
            iface_name: iface_name.trim().to_string(),
        })
    }

    /// Restore the named snapshot, in the fixed order mandated by spec §4.1:
    /// firewall → DNS → sysctl → NM active connection → service states →
    /// IPv6 re-enable → connection-manager restart.
    ///
    /// Falls back to safe defaults (and returns `SnapshotInvalid`) if the
    /// snapshot is absent or incomplete.
    pub async fn restore(&self, name: &str) -> Result<(), SnapshotError> {
        if !self.is_valid(name) {
            warn!(name, "snapshot missing or incomplete; applying safe defaults");
            safe_defaults::apply(Path::new(RESOLV_PATH)).await;
            return Err(SnapshotError::Invalid(name.to_string()));
        }

        let snapshot = self.read(name).await?;

        self.restore_firewall(&snapshot.firewall_ruleset).await;
        resolv::restore(Path::new(RESOLV_PATH), &snapshot.resolv).await?;
        self.restore_sysctl(&snapshot.sysctl_values, SYSCTL_KEYS).await;
        if let Some(conn) = &snapshot.nm_active {
            anon_shell::run_best_effort("nmcli", &["connection", "up", conn]).await;
        }
        self.restore_services(&snapshot.service_states).await;
        self.restore_sysctl(&snapshot.sysctl_values, IPV6_KEYS).await;
        anon_shell::run_best_effort("systemctl", &["restart", "NetworkManager"]).await;

        info!(name, "snapshot restored");
        Ok(())
    }

    async fn restore_firewall(&self, blob: &FirewallBlob) {
        match blob {
            FirewallBlob::Modern { ruleset } => {
                anon_shell::run_best_effort("nft", &["flush", "ruleset"]).await;
                if ruleset != anon_core::snapshot::UNKNOWN {
                    let _ = restore_via_stdin("nft", &["-f", "-"], ruleset).await;
                }
            }
            FirewallBlob::Legacy { v4, v6, set_state } => {
                if v4 != anon_core::snapshot::UNKNOWN {
                    let _ = restore_via_stdin("iptables-restore", &[], v4).await;
                }
                if v6 != anon_core::snapshot::UNKNOWN {
                    let _ = restore_via_stdin("ip6tables-restore", &[], v6).await;
                }
                if set_state != anon_core::snapshot::UNKNOWN {
                    let _ = restore_via_stdin("ipset", &["restore"], set_state).await;
                }
            }
            FirewallBlob::Unknown => {
                safe_defaults::apply(Path::new(RESOLV_PATH)).await;
            }
        }
    }

    async fn restore_sysctl(&self, values: &BTreeMap<String, String>, keys: &[&str]) {
        for key in keys {
            let Some(value) = values.get(*key) else { continue };
            if value == anon_core::snapshot::UNKNOWN {
                continue;
            }
            let path = format!("/proc/sys/{key}");
            if let Err(e) = tokio::fs::write(&path, format!("{value}\n")).await {
                warn!(key, error = %e, "failed to restore sysctl value");
            }
        }
    }

    async fn restore_services(&self, states: &BTreeMap<String, ServiceRecord>) {
        for (svc, record) in states {
            match record.enabled {
                ServiceStatus::Enabled => anon_shell::run_best_effort("systemctl", &["enable", svc]).await,
                ServiceStatus::Disabled => anon_shell::run_best_effort("systemctl", &["disable", svc]).await,
                ServiceStatus::NotFound => {}
            }
            match record.active {
                ServiceState::Active => anon_shell::run_best_effort("systemctl", &["start", svc]).await,
                ServiceState::Inactive => anon_shell::run_best_effort("systemctl", &["stop", svc]).await,
            }
        }
    }
}

async fn capture_stream(program: &str, args: &[&str]) -> String {
    match anon_shell::run_checked(program, args).await {
        Ok(out) => anon_shell::stdout_string(&out),
        Err(_) => anon_core::snapshot::UNKNOWN.to_string(),
    }
}

async fn restore_via_stdin(program: &str, args: &[&str], input: &str) -> Result<(), anon_shell::ExecError> {
    use tokio::io::AsyncWriteExt;
    use tokio::process::Command;
    let mut child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|source| anon_shell::ExecError::Io { program: program.to_string(), source })?;
    if let Some(stdin) = child.stdin.as_mut() {
        let _ = stdin.write_all(input.as_bytes()).await;
    }
    let output = child
        .wait_with_output()
        .await
        .map_err(|source| anon_shell::ExecError::Io { program: program.to_string(), source })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(anon_shell::ExecError::NonZeroExit {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn restore_without_snapshot_reports_invalid() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path());
        let err = store.restore("initial").await.unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)));
    }

    #[tokio::test]
    async fn staging_without_marker_is_never_valid() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path());
        tokio::fs::create_dir_all(dir.path().join("initial")).await.expect("mkdir");
        tokio::fs::write(dir.path().join("initial").join("sysctl.val"), "1").await.expect("write");
        assert!(!store.is_valid("initial"));
    }

    #[tokio::test]
    async fn save_is_noop_when_initial_already_valid() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path());
        let snap_dir = dir.path().join("initial");
        tokio::fs::create_dir_all(&snap_dir).await.expect("mkdir");
        tokio::fs::write(snap_dir.join(MARKER), b"").await.expect("marker");
        tokio::fs::write(snap_dir.join("sentinel"), b"keep-me").await.expect("sentinel");

        let capture = SnapshotCapture {
            firewall_backend: FirewallBackend::Unknown,
            service_names: vec![],
            iface_name: "eth0".into(),
        };
        store.save("initial", &capture).await.expect("save should no-op");
        assert!(snap_dir.join("sentinel").exists(), "no-op save must not touch the existing valid snapshot");
    }

    #[tokio::test]
    async fn stale_staging_dir_is_removed_before_save() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path());
        let staging = dir.path().join("initial.staging");
        tokio::fs::create_dir_all(&staging).await.expect("mkdir");
        tokio::fs::write(staging.join("leftover"), b"x").await.expect("write");

        let capture = SnapshotCapture {
            firewall_backend: FirewallBackend::Unknown,
            service_names: vec![],
            iface_name: "eth0".into(),
        };
        store.save("initial", &capture).await.expect("save");
        assert!(store.is_valid("initial"));
        assert!(!dir.path().join("initial").join("leftover").exists());
    }
}
