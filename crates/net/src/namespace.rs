// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Namespace Manager (spec §4.3): creates and destroys the isolated network
//! namespace, its veth pair, and the host-side NAT that lets it reach the
//! Internet via the chosen egress interface.

use anon_core::NamespaceTopology;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::NetError;

const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Owns the namespace lifecycle for a fixed [`NamespaceTopology`].
pub struct NamespaceManager {
    topo: NamespaceTopology,
    egress_iface: String,
}

impl NamespaceManager {
    pub fn new(topo: NamespaceTopology, egress_iface: impl Into<String>) -> Self {
        Self { topo, egress_iface: egress_iface.into() }
    }

    /// Idempotently (re)create the namespace, veth pair, and SNAT rule.
    ///
    /// Any failure after namespace creation unwinds what this call itself
    /// did (delete veth, delete namespace) before returning; the caller's
    /// own compensation stack is untouched because nothing was pushed to it
    /// on failure.
    pub async fn create(&self) -> Result<(), NetError> {
        self.destroy_namespace_best_effort().await;

        self.run_ip(&["netns", "add", self.topo.ns_name]).await?;

        if let Err(e) = self.create_veth_pair().await {
            self.destroy_namespace_best_effort().await;
            return Err(e);
        }

        if let Err(e) = self.configure_addressing().await {
            self.unwind_veth().await;
            self.destroy_namespace_best_effort().await;
            return Err(e);
        }

        if let Err(e) = self.install_nat().await {
            self.unwind_veth().await;
            self.destroy_namespace_best_effort().await;
            return Err(e);
        }

        info!(ns = self.topo.ns_name, "namespace created");
        Ok(())
    }

    async fn create_veth_pair(&self) -> Result<(), NetError> {
        self.run_ip(&[
            "link", "add", self.topo.veth_host_name, "type", "veth", "peer", "name",
            self.topo.veth_ns_name,
        ])
        .await?;
        self.run_ip(&["link", "set", self.topo.veth_ns_name, "netns", self.topo.ns_name]).await?;
        Ok(())
    }

    async fn configure_addressing(&self) -> Result<(), NetError> {
        let host_cidr = format!("{}/24", self.topo.host_ip);
        let tor_cidr = format!("{}/24", self.topo.tor_ip);

        self.run_ip(&["addr", "add", &host_cidr, "dev", self.topo.veth_host_name]).await?;
        self.run_ip(&["link", "set", self.topo.veth_host_name, "up"]).await?;

        self.run_ip_netns(&["addr", "add", &tor_cidr, "dev", self.topo.veth_ns_name]).await?;
        self.run_ip_netns(&["link", "set", self.topo.veth_ns_name, "up"]).await?;
        self.run_ip_netns(&["link", "set", "lo", "up"]).await?;
        self.run_ip_netns(&["route", "add", "default", "via", self.topo.host_ip]).await?;

        anon_shell::run_checked(
            "sysctl",
            &["-w", "net.ipv4.ip_forward=1"],
        )
        .await
        .map_err(NetError::from)?;

        Ok(())
    }

    async fn install_nat(&self) -> Result<(), NetError> {
        anon_shell::run_checked(
            "iptables",
            &[
                "-t", "nat", "-A", "POSTROUTING",
                "-s", self.topo.subnet_cidr,
                "-o", &self.egress_iface,
                "-j", "MASQUERADE",
            ],
        )
        .await
        .map_err(NetError::from)?;
        Ok(())
    }

    /// Remove the SNAT rule, terminate resident processes, delete the
    /// namespace, and remove any leftover host-side veth (spec §4.3).
    pub async fn destroy(&self) -> Result<(), NetError> {
        anon_shell::run_best_effort(
            "iptables",
            &[
                "-t", "nat", "-D", "POSTROUTING",
                "-s", self.topo.subnet_cidr,
                "-o", &self.egress_iface,
                "-j", "MASQUERADE",
            ],
        )
        .await;

        self.terminate_resident_processes().await;
        self.destroy_namespace_best_effort().await;
        self.unwind_veth().await;

        info!(ns = self.topo.ns_name, "namespace destroyed");
        Ok(())
    }

    async fn terminate_resident_processes(&self) {
        let pids_output =
            anon_shell::run_checked("ip", &["netns", "pids", self.topo.ns_name]).await;
        let Ok(output) = pids_output else { return };
        let pids: Vec<String> =
            anon_shell::stdout_string(&output).lines().map(str::to_string).collect();
        for pid in &pids {
            anon_shell::run_best_effort("kill", &["-TERM", pid]).await;
        }
        if pids.is_empty() {
            return;
        }
        tokio::time::sleep(GRACE_PERIOD).await;
        for pid in &pids {
            anon_shell::run_best_effort("kill", &["-KILL", pid]).await;
        }
    }

    async fn destroy_namespace_best_effort(&self) {
        anon_shell::run_best_effort("ip", &["netns", "delete", self.topo.ns_name]).await;
    }

    async fn unwind_veth(&self) {
        anon_shell::run_best_effort("ip", &["link", "delete", self.topo.veth_host_name]).await;
    }

    /// Run a command inside the namespace's network context.
    pub async fn exec(&self, program: &str, args: &[&str]) -> Result<std::process::Output, NetError> {
        let mut full_args = vec!["netns", "exec", self.topo.ns_name, program];
        full_args.extend_from_slice(args);
        anon_shell::run(
            "ip",
            &full_args,
            anon_shell::DEFAULT_TIMEOUT,
        )
        .await
        .map_err(NetError::from)
    }

    async fn run_ip(&self, args: &[&str]) -> Result<(), NetError> {
        anon_shell::run_checked("ip", args).await.map_err(NetError::from)?;
        Ok(())
    }

    async fn run_ip_netns(&self, args: &[&str]) -> Result<(), NetError> {
        let mut full_args = vec!["netns", "exec", self.topo.ns_name, "ip"];
        full_args.extend_from_slice(args);
        match anon_shell::run_checked("ip", &full_args).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(ns = self.topo.ns_name, error = %e, "namespace-internal ip command failed");
                Err(NetError::from(e))
            }
        }
    }
}
