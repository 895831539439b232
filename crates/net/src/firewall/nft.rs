// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Modern backend: nftables, addressed declaratively through `nft`.

use anon_core::KillswitchRules;
use async_trait::async_trait;

use super::{FirewallBackendImpl, TABLE_NAME};
use crate::error::NetError;

const FAMILY: &str = "inet";

pub struct NftBackend;

impl NftBackend {
    pub fn new() -> Self {
        Self
    }

    async fn nft(&self, args: &[&str]) -> Result<(), NetError> {
        anon_shell::run_checked("nft", args).await.map_err(NetError::from)?;
        Ok(())
    }

    async fn nft_best_effort(&self, args: &[&str]) {
        anon_shell::run_best_effort("nft", args).await;
    }
}

impl Default for NftBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FirewallBackendImpl for NftBackend {
    async fn engage(&self, rules: &KillswitchRules) -> Result<(), NetError> {
        self.nft(&["add", "table", FAMILY, TABLE_NAME]).await?;

        self.nft(&[
            "add", "chain", FAMILY, TABLE_NAME, "output",
            "{", "type", "filter", "hook", "output", "priority", "0", ";", "policy", "drop", ";", "}",
        ])
        .await?;
        self.nft(&[
            "add", "chain", FAMILY, TABLE_NAME, "input",
            "{", "type", "filter", "hook", "input", "priority", "0", ";", "policy", "drop", ";", "}",
        ])
        .await?;
        self.nft(&[
            "add", "chain", FAMILY, TABLE_NAME, "forward",
            "{", "type", "filter", "hook", "forward", "priority", "0", ";", "policy", "drop", ";", "}",
        ])
        .await?;
        self.nft(&[
            "add", "chain", FAMILY, TABLE_NAME, "prerouting",
            "{", "type", "nat", "hook", "prerouting", "priority", "-100", ";", "}",
        ])
        .await?;
        self.nft(&[
            "add", "chain", FAMILY, TABLE_NAME, "postrouting",
            "{", "type", "nat", "hook", "postrouting", "priority", "100", ";", "}",
        ])
        .await?;

        let uid = rules.tor_uid.to_string();
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", "oif", "lo", "accept"]).await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", "ct", "state", "established,related", "accept"])
            .await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", "meta", "skuid", &uid, "accept"]).await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", "ip", "daddr", &rules.ns_subnet, "accept"])
            .await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", "ip", "saddr", &rules.ns_subnet, "accept"])
            .await?;
        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "output", "udp", "dport", "{", "67", ",", "68", "}", "accept",
        ])
        .await?;

        for ip in &rules.doh_blocklist {
            let addr = ip.to_string();
            self.nft(&[
                "add", "rule", FAMILY, TABLE_NAME, "output", "ip", "daddr", &addr, "tcp", "dport",
                "{", "443", ",", "853", "}", "reject", "with", "tcp", "reset",
            ])
            .await?;
        }

        for (port, proto) in &rules.webrtc_ports {
            let port_s = port.to_string();
            let proto_s = match proto {
                anon_core::killswitch::Protocol::Tcp => "tcp",
                anon_core::killswitch::Protocol::Udp => "udp",
            };
            self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", proto_s, "dport", &port_s, "drop"]).await?;
        }

        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "output", "udp", "dport", "5353", "ip", "daddr", "!=",
            &rules.tor_endpoint.address.to_string(), "drop",
        ])
        .await?;

        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "output", "log", "prefix", "\"anonmanager-drop: \"", "drop"])
            .await?;

        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "input", "iif", "lo", "accept"]).await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "input", "ct", "state", "established,related", "accept"])
            .await?;

        let host_veth = rules.ns_subnet.clone();
        let _ = host_veth;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "forward", "ip", "saddr", &rules.ns_subnet, "accept"])
            .await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "forward", "ip", "daddr", &rules.ns_subnet, "accept"])
            .await?;

        let dns_port = rules.tor_endpoint.dns_port.to_string();
        let trans_port = rules.tor_endpoint.trans_port.to_string();
        let tor_ip = rules.tor_endpoint.address.to_string();

        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "prerouting", "meta", "skuid", &uid, "return"]).await?;
        self.nft(&["add", "rule", FAMILY, TABLE_NAME, "prerouting", "iif", "lo", "return"]).await?;
        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "prerouting", "ip", "daddr", &rules.ns_subnet, "return",
        ])
        .await?;
        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "prerouting", "udp", "dport", "53", "dnat", "to",
            &format!("{tor_ip}:{dns_port}"),
        ])
        .await?;
        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "prerouting", "tcp", "dport", "53", "dnat", "to",
            &format!("{tor_ip}:{dns_port}"),
        ])
        .await?;
        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "prerouting", "tcp", "flags", "syn", "/", "syn,ack", "dnat", "to",
            &format!("{tor_ip}:{trans_port}"),
        ])
        .await?;

        self.nft(&[
            "add", "rule", FAMILY, TABLE_NAME, "postrouting", "ip", "saddr", &rules.ns_subnet, "oif",
            &rules.egress_iface, "masquerade",
        ])
        .await?;

        Ok(())
    }

    async fn disengage(&self) -> Result<(), NetError> {
        loop {
            let tables = anon_shell::run_checked("nft", &["list", "tables"]).await.map_err(NetError::from)?;
            let listing = anon_shell::stdout_string(&tables);
            if !listing.contains(TABLE_NAME) {
                break;
            }
            self.nft_best_effort(&["delete", "table", FAMILY, TABLE_NAME]).await;
        }
        Ok(())
    }

    async fn is_active(&self) -> bool {
        let Ok(output) = anon_shell::run_checked("nft", &["list", "tables"]).await else {
            return false;
        };
        anon_shell::stdout_string(&output).contains(TABLE_NAME)
    }
}
