// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Legacy backend: iptables / iptables-legacy, driven one rule at a time.
//! Grounded in the same direct `Command`-per-rule shape as a plain iptables
//! adapter, generalized to the anonmanager killswitch spec and made
//! idempotent via a comment tag instead of a blind flush.
//!
//! Unlike the nft backend, this backend has no table of its own to drop
//! wholesale — every rule lives in the host's shared built-in chains. So
//! every rule `engage` adds carries the comment tag, and `disengage`
//! deletes only the tagged lines (by line number, highest first so earlier
//! deletes don't shift numbers still to be deleted) rather than flushing
//! chains other host rules might also live in.

use anon_core::killswitch::Protocol;
use anon_core::KillswitchRules;
use async_trait::async_trait;

use super::FirewallBackendImpl;
use crate::error::NetError;

const COMMENT: &str = "anonmanager";

pub struct IptablesBackend {
    v4: &'static str,
    v6: &'static str,
}

impl IptablesBackend {
    pub fn new(v4: &'static str, v6: &'static str) -> Self {
        Self { v4, v6 }
    }

    async fn v4(&self, args: &[&str]) -> Result<(), NetError> {
        anon_shell::run_checked(self.v4, args).await.map_err(NetError::from)?;
        Ok(())
    }

    async fn v4_best_effort(&self, args: &[&str]) {
        anon_shell::run_best_effort(self.v4, args).await;
    }

    async fn v6_best_effort(&self, args: &[&str]) {
        anon_shell::run_best_effort(self.v6, args).await;
    }

    fn tag(&self) -> Vec<&str> {
        vec!["-m", "comment", "--comment", COMMENT]
    }

    /// `-A ... <args> <tag>` — every appended rule carries the comment tag
    /// so `disengage` can find it again later.
    async fn v4_tagged(&self, args: &[&str]) -> Result<(), NetError> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(self.tag());
        self.v4(&full).await
    }

    async fn v6_tagged_best_effort(&self, args: &[&str]) {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(self.tag());
        self.v6_best_effort(&full).await;
    }

    /// Delete every tagged rule in `chain` (optionally in `table`, default
    /// filter), by line number, highest first.
    async fn delete_tagged(&self, program: &str, table: Option<&str>, chain: &str) {
        let mut list_args: Vec<&str> = Vec::new();
        if let Some(t) = table {
            list_args.push("-t");
            list_args.push(t);
        }
        list_args.push("-L");
        list_args.push(chain);
        list_args.push("--line-numbers");
        list_args.push("-n");

        let Ok(output) = anon_shell::run_checked(program, &list_args).await else {
            return;
        };
        let listing = anon_shell::stdout_string(&output);

        let mut line_numbers: Vec<u32> = listing
            .lines()
            .filter(|line| line.contains(COMMENT))
            .filter_map(|line| line.split_whitespace().next())
            .filter_map(|n| n.parse().ok())
            .collect();
        line_numbers.sort_unstable_by(|a, b| b.cmp(a));

        for n in line_numbers {
            let n = n.to_string();
            let mut del_args: Vec<&str> = Vec::new();
            if let Some(t) = table {
                del_args.push("-t");
                del_args.push(t);
            }
            del_args.push("-D");
            del_args.push(chain);
            del_args.push(&n);
            anon_shell::run_best_effort(program, &del_args).await;
        }
    }
}

#[async_trait]
impl FirewallBackendImpl for IptablesBackend {
    async fn engage(&self, rules: &KillswitchRules) -> Result<(), NetError> {
        let uid = rules.tor_uid.to_string();
        let tor_ip = rules.tor_endpoint.address.to_string();
        let dns_port = rules.tor_endpoint.dns_port.to_string();
        let trans_port = rules.tor_endpoint.trans_port.to_string();

        // NAT OUTPUT: return-early for Tor, loopback, namespace subnet; DNAT
        // DNS and all TCP SYN to the namespace Tor endpoint.
        self.v4_tagged(&["-t", "nat", "-A", "OUTPUT", "-m", "owner", "--uid-owner", &uid, "-j", "RETURN"])
            .await?;
        self.v4_tagged(&["-t", "nat", "-A", "OUTPUT", "-o", "lo", "-j", "RETURN"]).await?;
        self.v4_tagged(&["-t", "nat", "-A", "OUTPUT", "-d", &rules.ns_subnet, "-j", "RETURN"]).await?;

        let dnat_dns = format!("{tor_ip}:{dns_port}");
        self.v4_tagged(&["-t", "nat", "-A", "OUTPUT", "-p", "udp", "--dport", "53", "-j", "DNAT", "--to-destination", &dnat_dns])
            .await?;
        self.v4_tagged(&["-t", "nat", "-A", "OUTPUT", "-p", "tcp", "--dport", "53", "-j", "DNAT", "--to-destination", &dnat_dns])
            .await?;

        let dnat_trans = format!("{tor_ip}:{trans_port}");
        self.v4_tagged(&[
            "-t", "nat", "-A", "OUTPUT", "-p", "tcp", "--syn", "-j", "DNAT", "--to-destination", &dnat_trans,
        ])
        .await?;

        self.v4_tagged(&[
            "-t", "nat", "-A", "POSTROUTING", "-s", &rules.ns_subnet, "-o", &rules.egress_iface, "-j", "MASQUERADE",
        ])
        .await?;

        // Filter OUTPUT: default DROP, explicit accepts, then log-and-drop.
        self.v4(&["-P", "OUTPUT", "DROP"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-o", "lo", "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-m", "state", "--state", "ESTABLISHED,RELATED", "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-m", "owner", "--uid-owner", &uid, "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-d", &rules.ns_subnet, "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-s", &rules.ns_subnet, "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-p", "udp", "--dport", "67:68", "-j", "ACCEPT"]).await?;

        for ip in &rules.doh_blocklist {
            let addr = ip.to_string();
            self.v4_tagged(&["-A", "OUTPUT", "-d", &addr, "-p", "tcp", "--dport", "443", "-j", "REJECT", "--reject-with", "tcp-reset"])
                .await?;
            self.v4_tagged(&["-A", "OUTPUT", "-d", &addr, "-p", "tcp", "--dport", "853", "-j", "REJECT", "--reject-with", "tcp-reset"])
                .await?;
        }

        for (port, proto) in &rules.webrtc_ports {
            let port_s = port.to_string();
            let proto_s = match proto {
                Protocol::Tcp => "tcp",
                Protocol::Udp => "udp",
            };
            self.v4_tagged(&["-A", "OUTPUT", "-p", proto_s, "--dport", &port_s, "-j", "DROP"]).await?;
        }

        self.v4_tagged(&["-A", "OUTPUT", "-p", "udp", "--dport", "5353", "!", "-d", &tor_ip, "-j", "DROP"]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-j", "LOG", "--log-prefix", "anonmanager-drop: "]).await?;
        self.v4_tagged(&["-A", "OUTPUT", "-j", "DROP"]).await?;

        self.v4_tagged(&["-A", "INPUT", "-i", "lo", "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "INPUT", "-m", "state", "--state", "ESTABLISHED,RELATED", "-j", "ACCEPT"]).await?;

        self.v4(&["-P", "FORWARD", "DROP"]).await?;
        self.v4_tagged(&["-A", "FORWARD", "-s", &rules.ns_subnet, "-j", "ACCEPT"]).await?;
        self.v4_tagged(&["-A", "FORWARD", "-d", &rules.ns_subnet, "-j", "ACCEPT"]).await?;

        // IPv6: default DROP, loopback only, no NAT.
        self.v6_best_effort(&["-P", "OUTPUT", "DROP"]).await;
        self.v6_best_effort(&["-P", "INPUT", "DROP"]).await;
        self.v6_best_effort(&["-P", "FORWARD", "DROP"]).await;
        self.v6_tagged_best_effort(&["-A", "OUTPUT", "-o", "lo", "-j", "ACCEPT"]).await;
        self.v6_tagged_best_effort(&["-A", "INPUT", "-i", "lo", "-j", "ACCEPT"]).await;

        Ok(())
    }

    async fn disengage(&self) -> Result<(), NetError> {
        self.delete_tagged(self.v4, Some("nat"), "OUTPUT").await;
        self.delete_tagged(self.v4, Some("nat"), "POSTROUTING").await;
        self.delete_tagged(self.v4, None, "OUTPUT").await;
        self.delete_tagged(self.v4, None, "INPUT").await;
        self.delete_tagged(self.v4, None, "FORWARD").await;
        self.v4_best_effort(&["-P", "OUTPUT", "ACCEPT"]).await;
        self.v4_best_effort(&["-P", "FORWARD", "ACCEPT"]).await;

        self.delete_tagged(self.v6, None, "OUTPUT").await;
        self.delete_tagged(self.v6, None, "INPUT").await;
        self.v6_best_effort(&["-P", "OUTPUT", "ACCEPT"]).await;
        self.v6_best_effort(&["-P", "INPUT", "ACCEPT"]).await;
        self.v6_best_effort(&["-P", "FORWARD", "ACCEPT"]).await;

        Ok(())
    }

    async fn is_active(&self) -> bool {
        // The tag is attached to the nat-table OUTPUT RETURN rule (and every
        // other rule `engage` adds), so checking any one tagged chain is
        // sufficient to detect engagement.
        let Ok(output) = anon_shell::run_checked(self.v4, &["-t", "nat", "-S", "OUTPUT"]).await else {
            return false;
        };
        anon_shell::stdout_string(&output).contains(COMMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_uses_the_shared_comment_constant() {
        let backend = IptablesBackend::new("iptables", "ip6tables");
        assert_eq!(backend.tag(), vec!["-m", "comment", "--comment", "anonmanager"]);
    }
}
