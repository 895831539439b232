// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Cross-cutting fault kinds (spec §7). Downstream crates wrap this via
//! `#[from]` into their own `thiserror` enums rather than matching on it
//! directly.

use thiserror::Error;

/// A fault originating anywhere in the orchestration pipeline.
///
/// Every variant carries enough context to produce one remedial action via
/// [`FaultError::remedy`] — required by spec §7 ("every terminal error
/// message names one remedial action").
#[derive(Debug, Error)]
pub enum FaultError {
    #[error("not invoked as a privileged user")]
    PermissionFault,

    #[error("another instance already holds the system lock (pid {held_by})")]
    LockContention { held_by: u32 },

    #[error("unsupported host: {reason}")]
    UnsupportedHost { reason: String },

    #[error("initial snapshot is absent or incomplete")]
    SnapshotInvalid,

    #[error("pipeline step '{step}' failed: {reason}")]
    StepFault { step: String, reason: String },

    #[error("Tor bootstrap did not reach 100% within {timeout_secs}s")]
    BootstrapTimeout { timeout_secs: u64 },

    #[error("required external tool not found in PATH: {tool}")]
    ExternalToolMissing { tool: String },

    #[error("operation '{op}' exceeded its {bound_secs}s timeout")]
    Transient { op: String, bound_secs: u64 },
}

impl FaultError {
    /// One actionable remediation string, as required by spec §7.
    pub fn remedy(&self) -> String {
        match self {
            FaultError::PermissionFault => "run with elevated privileges (sudo)".to_string(),
            FaultError::LockContention { .. } => {
                "another anonctl instance is active; use --status to inspect it".to_string()
            }
            FaultError::UnsupportedHost { .. } => {
                "this host's distribution or firewall backend is not supported".to_string()
            }
            FaultError::SnapshotInvalid => "use --restore to recover safe defaults".to_string(),
            FaultError::StepFault { .. } => "use --restore to recover safe defaults".to_string(),
            FaultError::BootstrapTimeout { .. } => {
                "check network connectivity and retry, or use --restore".to_string()
            }
            FaultError::ExternalToolMissing { tool } => {
                format!("install the '{tool}' package for this distribution")
            }
            FaultError::Transient { .. } => "retry the operation; the host may be under load".to_string(),
        }
    }

    /// Whether the fault should trigger `emergency_restore` per the
    /// propagation policy in spec §7 (anything after the initial snapshot).
    pub fn triggers_emergency_restore(&self) -> bool {
        !matches!(
            self,
            FaultError::PermissionFault | FaultError::LockContention { .. } | FaultError::UnsupportedHost { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remedy_is_always_present() {
        let faults = vec![
            FaultError::PermissionFault,
            FaultError::LockContention { held_by: 1 },
            FaultError::UnsupportedHost { reason: "x".into() },
            FaultError::SnapshotInvalid,
            FaultError::StepFault { step: "x".into(), reason: "y".into() },
            FaultError::BootstrapTimeout { timeout_secs: 180 },
            FaultError::ExternalToolMissing { tool: "nft".into() },
            FaultError::Transient { op: "sysctl".into(), bound_secs: 2 },
        ];
        for f in faults {
            assert!(!f.remedy().is_empty());
        }
    }

    #[test]
    fn permission_and_lock_faults_never_trigger_restore() {
        assert!(!FaultError::PermissionFault.triggers_emergency_restore());
        assert!(!FaultError::LockContention { held_by: 1 }.triggers_emergency_restore());
        assert!(!FaultError::UnsupportedHost { reason: "x".into() }.triggers_emergency_restore());
        assert!(FaultError::SnapshotInvalid.triggers_emergency_restore());
        assert!(FaultError::BootstrapTimeout { timeout_secs: 1 }.triggers_emergency_restore());
    }
}
