// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Firewall backend detection. Chosen once (spec §4.2); never switched at
//! runtime.

use anon_core::FirewallBackend;

/// Prefer the modern (nftables) backend when both `nft` works and the
/// kernel module is loaded; otherwise fall back to iptables-legacy.
pub async fn detect() -> FirewallBackend {
    if anon_shell::which("nft").is_ok() && nft_usable().await {
        return FirewallBackend::Modern;
    }
    if anon_shell::which("iptables-legacy").is_ok() {
        return FirewallBackend::LegacyAlt;
    }
    if anon_shell::which("iptables").is_ok() {
        return FirewallBackend::Legacy;
    }
    FirewallBackend::Unknown
}

async fn nft_usable() -> bool {
    anon_shell::run_checked("nft", &["list", "tables"]).await.is_ok()
}

/// Best-effort detection of the default egress interface via the kernel's
/// default route.
pub async fn default_egress_iface() -> Option<String> {
    let out = anon_shell::run_checked("ip", &["-o", "route", "show", "default"]).await.ok()?;
    let text = anon_shell::stdout_string(&out);
    parse_default_route_iface(&text)
}

fn parse_default_route_iface(text: &str) -> Option<String> {
    let line = text.lines().next()?;
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok == "dev" {
            return tokens.next().map(str::to_string);
        }
    }
    None
}

/// Whether the kernel supports network namespaces: `/proc/self/ns/net`
/// exists and `ip netns` is usable.
pub async fn kernel_supports_netns() -> bool {
    tokio::fs::metadata("/proc/self/ns/net").await.is_ok() && anon_shell::which("ip").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iface_from_default_route_line() {
        let text = "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n";
        assert_eq!(parse_default_route_iface(text), Some("wlan0".to_string()));
    }

    #[test]
    fn missing_dev_token_yields_none() {
        assert_eq!(parse_default_route_iface("unreachable\n"), None);
    }
}
