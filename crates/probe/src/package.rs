// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Package manager detection and the canonical → distro-specific package
//! name resolver (spec §8 scenario S4).

use anon_core::{DistroFamily, PackageManager};

/// Infer the package manager from the distro family. A dedicated probe
/// (checking for the binaries directly) would be more precise on mixed
/// hosts, but spec §4 C1 only asks for a "package-manager tag", and the
/// family mapping is unambiguous for the three supported families.
pub fn detect_manager(family: DistroFamily) -> PackageManager {
    match family {
        DistroFamily::Debian => PackageManager::Apt,
        DistroFamily::Arch => PackageManager::Pacman,
        DistroFamily::Rhel => PackageManager::Dnf,
        DistroFamily::Unknown => PackageManager::Unknown,
    }
}

/// Resolve a canonical package name to this package manager's name for it.
/// Unknown canonical names pass through unchanged (spec §8 S4).
pub fn resolve(manager: PackageManager, canonical: &str) -> String {
    let mapped = match (manager, canonical) {
        (PackageManager::Apt, "nc") => Some("netcat-openbsd"),
        (PackageManager::Pacman, "nc") => Some("openbsd-netcat"),
        (PackageManager::Dnf, "nc") => Some("nmap-ncat"),

        (PackageManager::Apt, "tor") => Some("tor"),
        (PackageManager::Pacman, "tor") => Some("tor"),
        (PackageManager::Dnf, "tor") => Some("tor"),

        (PackageManager::Apt, "nftables") => Some("nftables"),
        (PackageManager::Pacman, "nftables") => Some("nftables"),
        (PackageManager::Dnf, "nftables") => Some("nftables"),

        (PackageManager::Apt, "iptables") => Some("iptables"),
        (PackageManager::Pacman, "iptables") => Some("iptables-nft"),
        (PackageManager::Dnf, "iptables") => Some("iptables-nft"),

        (PackageManager::Apt, "ipset") => Some("ipset"),
        (PackageManager::Pacman, "ipset") => Some("ipset"),
        (PackageManager::Dnf, "ipset") => Some("ipset"),
        _ => None,
    };
    mapped.map(str::to_string).unwrap_or_else(|| canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        apt_nc = { PackageManager::Apt, "nc", "netcat-openbsd" },
        pacman_nc = { PackageManager::Pacman, "nc", "openbsd-netcat" },
        dnf_nc = { PackageManager::Dnf, "nc", "nmap-ncat" },
        apt_unknown_passthrough = { PackageManager::Apt, "foobar", "foobar" },
        pacman_unknown_passthrough = { PackageManager::Pacman, "foobar", "foobar" },
        dnf_unknown_passthrough = { PackageManager::Dnf, "foobar", "foobar" },
        unknown_manager_passthrough = { PackageManager::Unknown, "foobar", "foobar" },
    )]
    fn resolves_canonical_names(manager: PackageManager, canonical: &str, expected: &str) {
        assert_eq!(resolve(manager, canonical), expected);
    }
}
