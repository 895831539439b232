// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Status dashboard model (SPEC_FULL.md supplemented feature): the data
//! the `--status` flag prints. The core builds this snapshot; rendering it
//! to a terminal is the UI collaborator's job (spec §1 "out of scope").

use anon_core::{FirewallBackend, Mode};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub anonymity_active: bool,
    pub mode: Mode,
    pub firewall_backend: FirewallBackend,
    pub tor_running: bool,
    pub bootstrap_percent: Option<u8>,
    pub namespace_present: bool,
    pub dns_locked: bool,
    pub ipv6_disabled: bool,
    pub exit_ip: Option<String>,
}

impl StatusReport {
    pub fn is_healthy(&self) -> bool {
        if !self.anonymity_active {
            return true;
        }
        self.tor_running
            && self.namespace_present
            && self.dns_locked
            && self.ipv6_disabled
            && self.bootstrap_percent == Some(100)
    }
}
