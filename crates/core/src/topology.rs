// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Constants defining the isolation fabric (spec §3, §6). These are
//! configuration, not state: they must not change across invocations while
//! the system is active.

/// The literal network topology mandated by spec §6.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceTopology {
    pub ns_name: &'static str,
    pub veth_host_name: &'static str,
    pub veth_ns_name: &'static str,
    pub tor_ip: &'static str,
    pub host_ip: &'static str,
    pub subnet_cidr: &'static str,
}

impl NamespaceTopology {
    pub const fn fixed() -> Self {
        Self {
            ns_name: "anonspace",
            veth_host_name: "veth_host",
            veth_ns_name: "veth_tor",
            tor_ip: "10.200.1.1",
            host_ip: "10.200.1.2",
            subnet_cidr: "10.200.1.0/24",
        }
    }
}

impl Default for NamespaceTopology {
    fn default() -> Self {
        Self::fixed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_topology_matches_spec() {
        let t = NamespaceTopology::fixed();
        assert_eq!(t.ns_name, "anonspace");
        assert_eq!(t.tor_ip, "10.200.1.1");
        assert_eq!(t.host_ip, "10.200.1.2");
        assert_eq!(t.subnet_cidr, "10.200.1.0/24");
    }
}
