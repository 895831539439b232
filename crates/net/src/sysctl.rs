// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Sysctl Hardening & IPv6 (spec §4, §6): applies the fixed hardening
//! matrix and the IPv6-disable keys. Restoration of prior values is the
//! Snapshot Store's job (`anon_storage::snapshot_store`); this module only
//! ever pushes the hardened values forward.

use tracing::warn;

use crate::error::NetError;

/// The literal hardening matrix from spec §6, applied on extreme enable.
pub const HARDENING_MATRIX: &[(&str, &str)] = &[
    ("kernel.kptr_restrict", "2"),
    ("kernel.dmesg_restrict", "1"),
    ("kernel.unprivileged_bpf_disabled", "1"),
    ("net.core.bpf_jit_harden", "2"),
    ("net.ipv4.tcp_timestamps", "0"),
    ("net.ipv4.icmp_echo_ignore_all", "1"),
    ("net.ipv4.conf.all.accept_redirects", "0"),
    ("net.ipv4.conf.default.accept_redirects", "0"),
    ("net.ipv6.conf.all.accept_redirects", "0"),
    ("net.ipv6.conf.default.accept_redirects", "0"),
    ("net.ipv4.conf.all.accept_source_route", "0"),
    ("net.ipv4.conf.default.accept_source_route", "0"),
    ("net.ipv6.conf.all.accept_source_route", "0"),
    ("net.ipv6.conf.default.accept_source_route", "0"),
    ("net.ipv4.tcp_syncookies", "1"),
    ("net.ipv4.conf.all.rp_filter", "1"),
    ("net.ipv4.conf.default.rp_filter", "1"),
    ("net.ipv4.conf.all.send_redirects", "0"),
    ("net.ipv4.conf.default.send_redirects", "0"),
    ("net.ipv4.conf.all.log_martians", "1"),
    ("net.ipv4.conf.default.log_martians", "1"),
];

/// The IPv6-disable keys, applied/reverted as a distinct step (spec §4.1
/// restore order: "... → IPv6 re-enable → ...").
pub const IPV6_DISABLE_MATRIX: &[(&str, &str)] = &[
    ("net.ipv6.conf.all.disable_ipv6", "1"),
    ("net.ipv6.conf.default.disable_ipv6", "1"),
    ("net.ipv6.conf.all.accept_ra", "0"),
    ("net.ipv6.conf.default.accept_ra", "0"),
    ("net.ipv6.conf.all.autoconf", "0"),
    ("net.ipv6.conf.default.autoconf", "0"),
];

const RE_ENABLE_MATRIX: &[(&str, &str)] = &[
    ("net.ipv6.conf.all.disable_ipv6", "0"),
    ("net.ipv6.conf.default.disable_ipv6", "0"),
];

/// Apply the full hardening matrix. Per spec §7, a timeout on an individual
/// sysctl write is logged as a warning and does not abort hardening.
pub async fn apply_hardening() {
    apply_matrix(HARDENING_MATRIX).await;
}

/// Disable IPv6 per the matrix (forward direction of extreme enable).
pub async fn disable_ipv6() {
    apply_matrix(IPV6_DISABLE_MATRIX).await;
}

/// Re-enable IPv6 as part of restore (spec §4.1 restore order step 6).
pub async fn reenable_ipv6() -> Result<(), NetError> {
    for (key, value) in RE_ENABLE_MATRIX {
        write_one(key, value).await?;
    }
    Ok(())
}

async fn apply_matrix(matrix: &[(&str, &str)]) {
    for (key, value) in matrix {
        if let Err(e) = write_one(key, value).await {
            warn!(key, value, error = %e, "sysctl write failed, continuing hardening");
        }
    }
}

async fn write_one(key: &str, value: &str) -> Result<(), NetError> {
    let assignment = format!("{key}={value}");
    anon_shell::run_checked("sysctl", &["-w", &assignment]).await.map_err(NetError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn hardening_matrix_has_the_full_entry_count() {
        assert_eq!(HARDENING_MATRIX.len(), 20);
    }

    #[test]
    fn ipv6_disable_matrix_has_six_entries() {
        assert_eq!(IPV6_DISABLE_MATRIX.len(), 6);
    }

    #[parameterized(
        kptr_restrict = { "kernel.kptr_restrict", "2" },
        dmesg_restrict = { "kernel.dmesg_restrict", "1" },
        bpf_disabled = { "kernel.unprivileged_bpf_disabled", "1" },
        bpf_jit_harden = { "net.core.bpf_jit_harden", "2" },
        tcp_timestamps = { "net.ipv4.tcp_timestamps", "0" },
        icmp_echo_ignore = { "net.ipv4.icmp_echo_ignore_all", "1" },
        tcp_syncookies = { "net.ipv4.tcp_syncookies", "1" },
        v4_rp_filter = { "net.ipv4.conf.all.rp_filter", "1" },
        v6_accept_redirects = { "net.ipv6.conf.all.accept_redirects", "0" },
        v6_accept_source_route = { "net.ipv6.conf.default.accept_source_route", "0" },
    )]
    fn hardening_matrix_pins_each_literal_value(key: &str, expected: &str) {
        assert_eq!(
            HARDENING_MATRIX.iter().find(|(k, _)| *k == key).map(|(_, v)| *v),
            Some(expected),
        );
    }

    #[parameterized(
        disable_v4 = { "net.ipv6.conf.all.disable_ipv6", "1" },
        disable_default = { "net.ipv6.conf.default.disable_ipv6", "1" },
        accept_ra = { "net.ipv6.conf.all.accept_ra", "0" },
        autoconf = { "net.ipv6.conf.default.autoconf", "0" },
    )]
    fn ipv6_disable_matrix_pins_each_literal_value(key: &str, expected: &str) {
        assert_eq!(
            IPV6_DISABLE_MATRIX.iter().find(|(k, _)| *k == key).map(|(_, v)| *v),
            Some(expected),
        );
    }
}
