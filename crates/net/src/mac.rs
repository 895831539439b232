// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! MAC Rotator (spec §4, C10): randomizes the egress interface's
//! link-layer address, preferring the connection manager (NetworkManager)
//! so it re-applies the change the way it normally tracks interface state,
//! falling back to direct `ip link` manipulation when NetworkManager is
//! absent. Non-fatal: failures here never abort the enable pipeline
//! (spec §4.5).

use tracing::warn;

/// Randomize the link-layer address of `iface`. Returns whether a new MAC
/// was actually applied; callers treat `false` as non-fatal.
pub async fn randomize(iface: &str) -> bool {
    if anon_shell::which("nmcli").is_ok() {
        if randomize_via_networkmanager(iface).await {
            return true;
        }
        warn!(iface, "NetworkManager MAC randomization failed, falling back to ip link");
    }
    randomize_via_ip_link(iface).await
}

async fn randomize_via_networkmanager(iface: &str) -> bool {
    let connection = match anon_shell::run_checked(
        "nmcli",
        &["-t", "-f", "GENERAL.CONNECTION", "device", "show", iface],
    )
    .await
    {
        Ok(out) => anon_shell::stdout_string(&out).trim().trim_start_matches("GENERAL.CONNECTION:").to_string(),
        Err(_) => return false,
    };
    if connection.is_empty() || connection == "--" {
        return false;
    }

    anon_shell::run_checked(
        "nmcli",
        &["connection", "modify", &connection, "802-3-ethernet.cloned-mac-address", "random"],
    )
    .await
    .is_ok()
        && anon_shell::run_checked("nmcli", &["connection", "up", &connection]).await.is_ok()
}

async fn randomize_via_ip_link(iface: &str) -> bool {
    let random_mac = generate_locally_administered_mac();
    anon_shell::run_best_effort("ip", &["link", "set", iface, "down"]).await;
    let applied =
        anon_shell::run_checked("ip", &["link", "set", iface, "address", &random_mac]).await.is_ok();
    anon_shell::run_best_effort("ip", &["link", "set", iface, "up"]).await;
    applied
}

fn generate_locally_administered_mac() -> String {
    use rand::RngCore;
    let mut octets = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut octets);
    // Set the locally-administered bit, clear the multicast bit.
    octets[0] = (octets[0] | 0x02) & 0xfe;
    octets.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_mac_is_locally_administered_and_unicast() {
        for _ in 0..20 {
            let mac = generate_locally_administered_mac();
            let first_octet = u8::from_str_radix(&mac[0..2], 16).expect("valid hex");
            assert_eq!(first_octet & 0x02, 0x02, "locally-administered bit must be set");
            assert_eq!(first_octet & 0x01, 0x00, "multicast bit must be clear");
        }
    }
}
