// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Backend-independent killswitch specification (spec §3). The Firewall
//! Engine compiles this into backend-native rules; it never appears on the
//! wire or on disk verbatim, so it carries no `Serialize`/`Deserialize`.

use std::collections::BTreeSet;

/// The namespace-resident Tor instance's bound ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorEndpoint {
    pub address: std::net::Ipv4Addr,
    pub dns_port: u16,
    pub trans_port: u16,
    pub socks_port: u16,
    pub control_port: u16,
}

/// A logical, backend-independent killswitch specification (spec §3).
#[derive(Debug, Clone)]
pub struct KillswitchRules {
    pub tor_uid: u32,
    pub egress_iface: String,
    pub ns_subnet: String,
    pub tor_endpoint: TorEndpoint,
    /// Known DoH resolver IPs to reject (not merely drop) on 443/853.
    pub doh_blocklist: BTreeSet<std::net::IpAddr>,
    /// WebRTC STUN/TURN ports to drop.
    pub webrtc_ports: BTreeSet<(u16, Protocol)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl KillswitchRules {
    /// Build the rule specification for the fixed anonctl topology.
    #[allow(clippy::expect_used)]
    pub fn for_topology(tor_uid: u32, egress_iface: &str, topo: &crate::NamespaceTopology) -> Self {
        let mut doh_blocklist = BTreeSet::new();
        // Well-known DoH resolvers: Cloudflare, Google, Quad9.
        for ip in ["1.1.1.1", "1.0.0.1", "8.8.8.8", "8.8.4.4", "9.9.9.9"] {
            if let Ok(addr) = ip.parse() {
                doh_blocklist.insert(addr);
            }
        }

        let mut webrtc_ports = BTreeSet::new();
        for port in [3478u16, 5349, 19302] {
            webrtc_ports.insert((port, Protocol::Udp));
        }
        for port in [3478u16, 5349] {
            webrtc_ports.insert((port, Protocol::Tcp));
        }

        Self {
            tor_uid,
            egress_iface: egress_iface.to_string(),
            ns_subnet: topo.subnet_cidr.to_string(),
            tor_endpoint: TorEndpoint {
                address: topo.tor_ip.parse().expect("fixed topology IP is valid"),
                dns_port: 5353,
                trans_port: 9040,
                socks_port: 9050,
                control_port: 9051,
            },
            doh_blocklist,
            webrtc_ports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NamespaceTopology;

    #[test]
    fn for_topology_uses_fixed_ports() {
        let rules = KillswitchRules::for_topology(123, "eth0", &NamespaceTopology::fixed());
        assert_eq!(rules.tor_endpoint.dns_port, 5353);
        assert_eq!(rules.tor_endpoint.trans_port, 9040);
        assert_eq!(rules.tor_endpoint.socks_port, 9050);
        assert_eq!(rules.tor_endpoint.control_port, 9051);
        assert!(rules.webrtc_ports.contains(&(3478, Protocol::Udp)));
        assert!(rules.webrtc_ports.contains(&(19302, Protocol::Udp)));
    }
}
