// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! RuntimeState: persisted cross-invocation state (spec §3, §6).
//!
//! The on-disk form is `key=value`, one per known key, LF-terminated. This
//! module owns parsing/validation; `anon-storage::state_store` owns atomic
//! persistence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    None,
    Extreme,
    Partial,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::None => "none",
            Mode::Extreme => "extreme",
            Mode::Partial => "partial",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Mode::None),
            "extreme" => Some(Mode::Extreme),
            "partial" => Some(Mode::Partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistroFamily {
    Debian,
    Arch,
    Rhel,
    Unknown,
}

impl DistroFamily {
    fn as_str(self) -> &'static str {
        match self {
            DistroFamily::Debian => "debian",
            DistroFamily::Arch => "arch",
            DistroFamily::Rhel => "rhel",
            DistroFamily::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "debian" => Some(DistroFamily::Debian),
            "arch" => Some(DistroFamily::Arch),
            "rhel" => Some(DistroFamily::Rhel),
            "unknown" => Some(DistroFamily::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirewallBackend {
    Modern,
    Legacy,
    LegacyAlt,
    Unknown,
}

impl FirewallBackend {
    fn as_str(self) -> &'static str {
        match self {
            FirewallBackend::Modern => "modern",
            FirewallBackend::Legacy => "legacy",
            FirewallBackend::LegacyAlt => "legacy_alt",
            FirewallBackend::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "modern" => Some(FirewallBackend::Modern),
            "legacy" => Some(FirewallBackend::Legacy),
            "legacy_alt" => Some(FirewallBackend::LegacyAlt),
            "unknown" => Some(FirewallBackend::Unknown),
            _ => None,
        }
    }
}

/// The persisted cross-invocation state (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub anonymity_active: bool,
    pub mode: Mode,
    pub profile: String,
    /// Opaque handle to the watchdog task/process; `None` when inactive.
    pub monitor_handle: Option<u32>,
    pub distro_family: DistroFamily,
    pub firewall_backend: FirewallBackend,
    pub version: String,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            anonymity_active: false,
            mode: Mode::None,
            profile: "default".to_string(),
            monitor_handle: None,
            distro_family: DistroFamily::Unknown,
            firewall_backend: FirewallBackend::Unknown,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A key is valid iff it is composed solely of uppercase ASCII letters and
/// underscores (spec §3: "every key must match a fixed validation pattern").
fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_uppercase() || b == b'_')
}

impl RuntimeState {
    /// Parse the full `key=value` file content, ignoring unrecognized keys
    /// and invalid values (retaining the in-memory default for those).
    ///
    /// This is deliberately permissive: a malicious or corrupted line like
    /// `CURRENT_MODE=$(rm -rf /)` must never propagate further than being
    /// rejected as an invalid value for a known key.
    pub fn from_lines(content: &str) -> Self {
        let mut state = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if !is_valid_key(key) {
                continue;
            }
            state.apply_kv(key, value);
        }
        state
    }

    fn apply_kv(&mut self, key: &str, value: &str) {
        match key {
            "ANONYMITY_ACTIVE" => {
                if let Ok(b) = value.parse::<bool>() {
                    self.anonymity_active = b;
                }
            }
            "CURRENT_MODE" => {
                if let Some(m) = Mode::parse(value) {
                    self.mode = m;
                }
            }
            "PROFILE" => {
                // Any value composed of identifier-safe characters is accepted;
                // shell metacharacters are rejected outright rather than escaped.
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
                    self.profile = value.to_string();
                }
            }
            "MONITOR_HANDLE" => {
                if value.is_empty() {
                    self.monitor_handle = None;
                } else if let Ok(pid) = value.parse::<u32>() {
                    self.monitor_handle = Some(pid);
                }
            }
            "DISTRO_FAMILY" => {
                if let Some(d) = DistroFamily::parse(value) {
                    self.distro_family = d;
                }
            }
            "FIREWALL_BACKEND" => {
                if let Some(b) = FirewallBackend::parse(value) {
                    self.firewall_backend = b;
                }
            }
            "VERSION" => {
                self.version = value.to_string();
            }
            _ => {} // unrecognized key, ignored
        }
    }

    /// Render as `key=value` lines, LF-terminated (spec §6).
    pub fn to_lines(&self) -> String {
        format!(
            "ANONYMITY_ACTIVE={}\nCURRENT_MODE={}\nPROFILE={}\nMONITOR_HANDLE={}\nDISTRO_FAMILY={}\nFIREWALL_BACKEND={}\nVERSION={}\n",
            self.anonymity_active,
            self.mode.as_str(),
            self.profile,
            self.monitor_handle.map(|p| p.to_string()).unwrap_or_default(),
            self.distro_family.as_str(),
            self.firewall_backend.as_str(),
            self.version,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_fields() {
        let mut s = RuntimeState::default();
        s.anonymity_active = true;
        s.mode = Mode::Extreme;
        s.firewall_backend = FirewallBackend::Modern;
        let reloaded = RuntimeState::from_lines(&s.to_lines());
        assert_eq!(s, reloaded);
    }

    #[test]
    fn malicious_value_is_ignored_keeping_prior_mode() {
        let base = "ANONYMITY_ACTIVE=true\nCURRENT_MODE=extreme\n";
        let mut state = RuntimeState::from_lines(base);
        assert_eq!(state.mode, Mode::Extreme);

        let malicious = format!("{base}CURRENT_MODE=$(rm -rf /)\n");
        state = RuntimeState::from_lines(&malicious);
        assert_eq!(state.mode, Mode::Extreme, "invalid value must not override prior valid value");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let content = "ANONYMITY_ACTIVE=true\nSOME_FUTURE_KEY=whatever\n";
        let state = RuntimeState::from_lines(content);
        assert!(state.anonymity_active);
    }

    #[test]
    fn invalid_key_shape_is_ignored() {
        let content = "lowercase_key=true\nCURRENT_MODE=extreme\n";
        let state = RuntimeState::from_lines(content);
        assert!(!state.anonymity_active);
        assert_eq!(state.mode, Mode::Extreme);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any line content at all must parse without panicking, and must
        /// never produce a state that differs from the default except
        /// through values that pass the known-key validators above.
        #[test]
        fn from_lines_never_panics_on_arbitrary_content(content in ".{0,256}") {
            let _ = RuntimeState::from_lines(&content);
        }

        /// A run of well-formed `KEY=value` lines built from arbitrary
        /// uppercase-ASCII keys and arbitrary values either leaves the
        /// default untouched (unrecognized key) or is accepted by a known
        /// validator — it can never leave the struct in a state that
        /// `to_lines`/`from_lines` can't round-trip.
        #[test]
        fn well_formed_lines_always_round_trip(
            keys in prop::collection::vec("[A-Z_]{1,12}", 0..8),
            values in prop::collection::vec("[a-zA-Z0-9_-]{0,12}", 0..8),
        ) {
            let content: String = keys
                .iter()
                .zip(values.iter())
                .map(|(k, v)| format!("{k}={v}\n"))
                .collect();
            let state = RuntimeState::from_lines(&content);
            let reloaded = RuntimeState::from_lines(&state.to_lines());
            prop_assert_eq!(state, reloaded);
        }
    }
}
