// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Firewall Engine (spec §4.2): a dual-backend killswitch. Both backends
//! present identical semantics through [`FirewallBackendImpl`]; the choice
//! between them is made once by the Capability Probe and never switched at
//! runtime (spec §9, "Dynamic keyed dispatch → tagged variants").

mod iptables;
mod nft;

use anon_core::{FirewallBackend, KillswitchRules};
use async_trait::async_trait;

use crate::error::NetError;

/// The table/chain name prefix every backend tags its own rules with, so
/// `is_active` and `disengage` never touch rules anonctl didn't install.
pub const TABLE_NAME: &str = "anonmanager";

#[async_trait]
pub trait FirewallBackendImpl: Send + Sync {
    async fn engage(&self, rules: &KillswitchRules) -> Result<(), NetError>;
    async fn disengage(&self) -> Result<(), NetError>;
    async fn is_active(&self) -> bool;
}

/// Resolve the probed [`FirewallBackend`] tag to a concrete implementation.
///
/// Returns `None` for [`FirewallBackend::Unknown`]; callers must have
/// already turned that case into [`anon_core::FaultError::UnsupportedHost`]
/// during capability probing (spec §7).
pub fn backend_for(tag: FirewallBackend) -> Option<Box<dyn FirewallBackendImpl>> {
    match tag {
        FirewallBackend::Modern => Some(Box::new(nft::NftBackend::new())),
        FirewallBackend::Legacy => Some(Box::new(iptables::IptablesBackend::new("iptables", "ip6tables"))),
        FirewallBackend::LegacyAlt => {
            Some(Box::new(iptables::IptablesBackend::new("iptables-legacy", "ip6tables-legacy")))
        }
        FirewallBackend::Unknown => None,
    }
}

/// A thin orchestration wrapper that always runs `disengage` before
/// `engage` so repeated calls converge to the same state (spec §4.2
/// idempotence).
pub struct FirewallEngine {
    backend: Box<dyn FirewallBackendImpl>,
}

impl FirewallEngine {
    pub fn new(tag: FirewallBackend) -> Result<Self, NetError> {
        let backend = backend_for(tag).ok_or_else(|| NetError::Step {
            step: "firewall_backend_select",
            reason: "no firewall backend resolved for the probed tag".to_string(),
        })?;
        Ok(Self { backend })
    }

    pub async fn engage(&self, rules: &KillswitchRules) -> Result<(), NetError> {
        self.backend.disengage().await?;
        self.backend.engage(rules).await
    }

    pub async fn disengage(&self) -> Result<(), NetError> {
        self.backend.disengage().await
    }

    pub async fn is_active(&self) -> bool {
        self.backend.is_active().await
    }
}
