// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! anon-probe: the Capability Probe (spec §4 C1). Detects distribution
//! family, package manager, firewall backend, the Tor user/data dir, and
//! the kernel features the rest of the pipeline depends on. Run once at
//! startup; the result is never re-probed while the system is active
//! (spec §9 design note on backend selection).

pub mod distro;
pub mod firewall;
pub mod package;
pub mod tor_user;

use anon_core::{Capabilities, FaultError};
use tracing::warn;

/// Run every detection step and assemble the aggregate [`Capabilities`].
///
/// Returns [`FaultError::UnsupportedHost`] if the distro family or firewall
/// backend cannot be determined, per spec §7 ("PermissionFault and
/// UnsupportedHost are fatal immediately on startup").
pub async fn probe(egress_iface_hint: Option<&str>) -> Result<Capabilities, FaultError> {
    let distro_family = distro::detect().await;
    let package_manager = package::detect_manager(distro_family);
    let firewall_backend = firewall::detect().await;

    if matches!(firewall_backend, anon_core::FirewallBackend::Unknown) {
        return Err(FaultError::UnsupportedHost {
            reason: "neither nftables nor iptables-legacy tooling was found".to_string(),
        });
    }

    let (tor_uid, tor_user) = tor_user::detect().unwrap_or_else(|| {
        warn!("no Tor system user found in /etc/passwd, assuming debian-tor");
        (0, "debian-tor".to_string())
    });
    let tor_data_dir = tor_user::data_dir(&tor_user);
    let egress_iface = match egress_iface_hint {
        Some(iface) => iface.to_string(),
        None => firewall::default_egress_iface().await.unwrap_or_else(|| "eth0".to_string()),
    };
    let kernel_namespaces_supported = firewall::kernel_supports_netns().await;

    Ok(Capabilities {
        distro_family,
        package_manager,
        firewall_backend,
        tor_uid,
        tor_user,
        tor_data_dir,
        egress_iface,
        kernel_namespaces_supported,
    })
}
