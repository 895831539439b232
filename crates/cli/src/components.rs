// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Builds the read-only component handles (`--status`, `--verify`,
//! `--newid` need them without going through the Orchestrator, which keeps
//! its own copies private). Mirrors `anon_engine::orchestrator`'s private
//! helpers of the same shape.

use anon_core::OrchestrationContext;
use anon_net::{FirewallEngine, NamespaceManager};
use anon_tor::{ControlClient, TorSupervisor};

pub fn namespace(ctx: &OrchestrationContext) -> NamespaceManager {
    NamespaceManager::new(ctx.topology, ctx.capabilities.egress_iface.clone())
}

pub fn firewall(ctx: &OrchestrationContext) -> Result<FirewallEngine, anon_net::NetError> {
    FirewallEngine::new(ctx.capabilities.firewall_backend)
}

pub fn tor_supervisor(ctx: &OrchestrationContext) -> TorSupervisor {
    TorSupervisor::new(
        namespace(ctx),
        ctx.capabilities.tor_user.clone(),
        ctx.capabilities.tor_data_dir.clone(),
        ctx.paths.torrc_path.clone(),
        ctx.paths.root.join("tor.pid"),
    )
}

#[allow(clippy::expect_used)]
pub fn control_client(ctx: &OrchestrationContext) -> ControlClient {
    let rules = killswitch_rules(ctx);
    let addr = format!("{}:{}", ctx.topology.tor_ip, rules.tor_endpoint.control_port)
        .parse()
        .expect("fixed topology address/port always parses");
    ControlClient::new(addr, &ctx.capabilities.tor_data_dir)
}

pub fn killswitch_rules(ctx: &OrchestrationContext) -> anon_core::KillswitchRules {
    anon_core::KillswitchRules::for_topology(
        ctx.capabilities.tor_uid,
        &ctx.capabilities.egress_iface,
        &ctx.topology,
    )
}
