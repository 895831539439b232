// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Safe-defaults fallback used by `restore` when no valid snapshot exists
//! (spec §4.1): flush anonctl-specific chains/tables only, re-enable IPv6,
//! clear the immutable flag on the resolver config, restart the connection
//! manager.

use std::path::Path;
use tracing::{info, warn};

/// The anonctl-owned firewall table/chain names, flushed rather than the
/// whole ruleset, so unrelated host firewall rules survive a restore with
/// no valid snapshot.
pub const NFT_TABLE: &str = "anonctl";
pub const IPTABLES_CHAIN_PREFIX: &str = "ANONCTL_";

pub async fn apply(resolv_path: &Path) {
    flush_anonctl_firewall_state().await;
    reenable_ipv6().await;
    crate::resolv::restore_safe_default(resolv_path).await.unwrap_or_else(|e| {
        warn!(error = %e, "failed to restore resolver config to safe default");
    });
    restart_network_manager().await;
    info!("applied safe-default restore");
}

async fn flush_anonctl_firewall_state() {
    // Modern backend: delete the whole anonctl table if present.
    anon_shell::run_best_effort("nft", &["delete", "table", "inet", NFT_TABLE]).await;
    // Legacy backend: flush only anonctl-prefixed chains, then delete them.
    for table in ["filter", "nat"] {
        let _ = list_and_flush_iptables_chains("iptables", table).await;
        let _ = list_and_flush_iptables_chains("ip6tables", table).await;
    }
}

async fn list_and_flush_iptables_chains(binary: &str, table: &str) -> Option<()> {
    let out = anon_shell::run_checked(binary, &["-t", table, "-S"]).await.ok()?;
    let text = anon_shell::stdout_string(&out);
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("-N ") {
            let chain = rest.trim();
            if chain.starts_with(IPTABLES_CHAIN_PREFIX) {
                anon_shell::run_best_effort(binary, &["-t", table, "-F", chain]).await;
                anon_shell::run_best_effort(binary, &["-t", table, "-X", chain]).await;
            }
        }
    }
    Some(())
}

async fn reenable_ipv6() {
    for key in ["net/ipv6/conf/all/disable_ipv6", "net/ipv6/conf/default/disable_ipv6"] {
        let path = format!("/proc/sys/{key}");
        if let Err(e) = tokio::fs::write(&path, b"0\n").await {
            warn!(key, error = %e, "failed to re-enable ipv6 sysctl during safe-default restore");
        }
    }
}

async fn restart_network_manager() {
    anon_shell::run_best_effort("systemctl", &["restart", "NetworkManager"]).await;
}
