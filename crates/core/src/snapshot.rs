// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Snapshot data model (spec §3). Persistence lives in `anon-storage`; this
//! module only defines the shape, keeping the pure data separate from the
//! on-disk read/write logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel stored for any captured value that exceeded its timeout guard
/// (spec §4.1). `restore` skips keys whose value equals this sentinel.
pub const UNKNOWN: &str = "UNKNOWN";

/// Captured resolver configuration (spec §3), symlink-aware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ResolvState {
    /// `/etc/resolv.conf` was a symlink.
    Symlink {
        absolute_target: String,
        relative_target: String,
        content: String,
    },
    /// `/etc/resolv.conf` was a regular file.
    File { content: String, immutable: bool },
}

/// A service's enabled/active pair as read from the init system (spec §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceStatus {
    Enabled,
    Disabled,
    NotFound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRecord {
    pub enabled: ServiceStatus,
    pub active: ServiceState,
}

/// A named, on-disk record of prior system state (spec §3).
///
/// Invariant: a snapshot is valid iff `completion_marker` is `true` in the
/// persisted form — in memory this struct is only ever constructed once all
/// fields are known, so the on-disk marker file is the sole source of truth
/// for validity (see `anon_storage::snapshot_store`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    /// Opaque serialized blob, backend-specific (nft ruleset text, or the
    /// three iptables-legacy streams joined with a separator).
    pub firewall_ruleset: FirewallBlob,
    pub sysctl_values: BTreeMap<String, String>,
    pub resolv: ResolvState,
    pub service_states: BTreeMap<String, ServiceRecord>,
    pub nm_active: Option<String>,
    pub iface_name: String,
}

/// Backend-specific firewall capture (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FirewallBlob {
    /// Modern backend: the full declarative ruleset (`nft list ruleset`).
    Modern { ruleset: String },
    /// Legacy backend: three saved streams (v4, v6, ipset state).
    Legacy { v4: String, v6: String, set_state: String },
    /// Capture failed or backend unsupported; restore will skip firewall.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolv_symlink_roundtrips_through_json() {
        let r = ResolvState::Symlink {
            absolute_target: "/run/systemd/resolve/stub-resolv.conf".into(),
            relative_target: "../run/systemd/resolve/stub-resolv.conf".into(),
            content: "nameserver 127.0.0.53\n".into(),
        };
        let json = serde_json::to_string(&r).expect("serialize");
        let back: ResolvState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(r, back);
    }
}
