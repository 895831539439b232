// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Orchestration context: the single struct collecting every piece of
//! process-wide configuration, replacing the source's global mutable state
//! (spec §9, "Global mutable configuration → explicit context").
//!
//! Passed by reference to every component: `&OrchestrationContext` for
//! read-only consumers (Watchdog, Verifier), `&mut OrchestrationContext` for
//! the Orchestrator and anything that updates `RuntimeState`.

use crate::{DistroFamily, FirewallBackend, NamespaceTopology, Paths, RuntimeState};

/// The host's package manager, used to resolve canonical package names to
/// distro-specific ones (spec §4 C1, scenario S4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Pacman,
    Dnf,
    Unknown,
}

/// Host capabilities detected once at startup by the Capability Probe (C1)
/// and never re-probed while the system is active (spec §4: "the choice is
/// made once... and never switched at runtime").
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub distro_family: DistroFamily,
    pub package_manager: PackageManager,
    pub firewall_backend: FirewallBackend,
    pub tor_uid: u32,
    pub tor_user: String,
    pub tor_data_dir: std::path::PathBuf,
    pub egress_iface: String,
    /// Whether the kernel supports network namespaces (`CLONE_NEWNET`) and
    /// nft/iptables are both present as applicable.
    pub kernel_namespaces_supported: bool,
}

/// The orchestration context threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct OrchestrationContext {
    pub paths: Paths,
    pub topology: NamespaceTopology,
    pub capabilities: Capabilities,
    pub state: RuntimeState,
}

impl OrchestrationContext {
    pub fn new(paths: Paths, capabilities: Capabilities, state: RuntimeState) -> Self {
        Self { paths, topology: NamespaceTopology::fixed(), capabilities, state }
    }
}
