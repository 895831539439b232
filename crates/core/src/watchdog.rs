// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Watchdog alert data model (spec §3). The channel plumbing lives in
//! `anon-engine::watchdog`; this module defines the tagged message shape.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCategory {
    Tor,
    Firewall,
    Dns,
    Ipv6,
    Namespace,
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertCategory::Tor => "TOR",
            AlertCategory::Firewall => "FIREWALL",
            AlertCategory::Dns => "DNS",
            AlertCategory::Ipv6 => "IPV6",
            AlertCategory::Namespace => "NAMESPACE",
        };
        write!(f, "{s}")
    }
}

/// A tagged alert emitted by the watchdog (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogAlert {
    pub category: AlertCategory,
    pub message: String,
}

impl WatchdogAlert {
    pub fn new(category: AlertCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into() }
    }

    /// The single line written to the named alert channel (spec §4.6).
    pub fn to_line(&self) -> String {
        format!("[{}] {}", self.category, self.message)
    }
}
