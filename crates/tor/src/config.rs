// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Tor configuration rendering (spec §6, "Tor configuration emitted"). The
//! torrc binds every port to the namespace Tor IP, bit-exact; the
//! proxychains-style helper file is a separate artifact written for the
//! user's own tooling, not consumed by anonctl itself.

use anon_core::{KillswitchRules, Paths};

/// Render the torrc for the namespace-resident Tor instance.
///
/// No secrets ever appear in this file or on the command line (spec §4.4):
/// cookie authentication is enabled, but the cookie itself is a file the
/// supervisor reads, never a torrc value.
pub fn render_torrc(rules: &KillswitchRules, data_dir: &std::path::Path) -> String {
    let ep = &rules.tor_endpoint;
    format!(
        "\
SocksPort {addr}:{socks_port}
DNSPort {addr}:{dns_port}
TransPort {addr}:{trans_port}
ControlPort {addr}:{control_port}
SocksPolicy accept {subnet}
SocksPolicy reject *
CookieAuthentication 1
DataDirectory {data_dir}
AvoidDiskWrites 1
SafeLogging 1
DisableDebuggerAttachment 1
ClientRejectInternalAddresses 1
WarnUnsafeSocks 1
MaxMemInQueues 256 MB
NewCircuitPeriod 30
",
        addr = ep.address,
        socks_port = ep.socks_port,
        dns_port = ep.dns_port,
        trans_port = ep.trans_port,
        control_port = ep.control_port,
        subnet = rules.ns_subnet,
        data_dir = data_dir.display(),
    )
}

/// Render the proxychains-style helper file: a single SOCKS5 upstream at
/// the namespace Tor endpoint, strict chaining, DNS resolved through the
/// proxy (spec §6).
pub fn render_proxychains(rules: &KillswitchRules) -> String {
    format!(
        "\
strict_chain
proxy_dns
remote_dns_subnet 224
tcp_read_time_out 15000
tcp_connect_time_out 8000

[ProxyList]
socks5 {} {}
",
        rules.tor_endpoint.address, rules.tor_endpoint.socks_port
    )
}

/// Write the torrc to its configuration path under the anonctl root.
pub async fn write_torrc(paths: &Paths, rules: &KillswitchRules, data_dir: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
    let path = paths.torrc_path.clone();
    tokio::fs::write(&path, render_torrc(rules, data_dir)).await?;
    Ok(path)
}

/// Write the proxychains helper file under the anonctl root.
pub async fn write_proxychains(paths: &Paths, rules: &KillswitchRules) -> std::io::Result<std::path::PathBuf> {
    let path = paths.proxychains_path.clone();
    tokio::fs::write(&path, render_proxychains(rules)).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anon_core::NamespaceTopology;

    fn rules() -> KillswitchRules {
        KillswitchRules::for_topology(123, "eth0", &NamespaceTopology::fixed())
    }

    #[test]
    fn torrc_binds_every_port_to_namespace_tor_ip() {
        let rendered = render_torrc(&rules(), std::path::Path::new("/var/lib/tor"));
        assert!(rendered.contains("SocksPort 10.200.1.1:9050"));
        assert!(rendered.contains("DNSPort 10.200.1.1:5353"));
        assert!(rendered.contains("TransPort 10.200.1.1:9040"));
        assert!(rendered.contains("ControlPort 10.200.1.1:9051"));
        assert!(rendered.contains("CookieAuthentication 1"));
        assert!(!rendered.to_lowercase().contains("password"));
    }

    #[test]
    fn proxychains_file_has_single_socks5_upstream() {
        let rendered = render_proxychains(&rules());
        assert!(rendered.contains("strict_chain"));
        assert!(rendered.contains("proxy_dns"));
        assert!(rendered.contains("socks5 10.200.1.1 9050"));
    }
}
