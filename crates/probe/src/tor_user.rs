// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Tor system user and data directory detection.

use std::path::PathBuf;

/// Candidate system usernames for the Tor daemon, checked in the order
/// distro packaging actually uses them.
const CANDIDATE_USERS: &[&str] = &["debian-tor", "tor", "_tor"];

/// Look up the Tor system user by scanning `/etc/passwd` for the first
/// matching candidate name, returning its uid.
pub fn detect() -> Option<(u32, String)> {
    let content = std::fs::read_to_string("/etc/passwd").ok()?;
    find_tor_user(&content)
}

fn find_tor_user(passwd: &str) -> Option<(u32, String)> {
    for candidate in CANDIDATE_USERS {
        for line in passwd.lines() {
            let mut fields = line.split(':');
            let name = fields.next()?;
            if name != *candidate {
                continue;
            }
            let uid: u32 = fields.nth(1)?.parse().ok()?;
            return Some((uid, name.to_string()));
        }
    }
    None
}

/// Conventional Tor data directory for a given system user. Debian/Arch/RHEL
/// packaging all settle on `/var/lib/tor` regardless of username.
pub fn data_dir(_tor_user: &str) -> PathBuf {
    PathBuf::from("/var/lib/tor")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_debian_tor_entry() {
        let passwd = "root:x:0:0:root:/root:/bin/bash\ndebian-tor:x:123:123::/var/lib/tor:/bin/false\n";
        assert_eq!(find_tor_user(passwd), Some((123, "debian-tor".to_string())));
    }

    #[test]
    fn finds_bare_tor_entry_when_debian_tor_absent() {
        let passwd = "root:x:0:0:root:/root:/bin/bash\ntor:x:456:456::/var/lib/tor:/bin/false\n";
        assert_eq!(find_tor_user(passwd), Some((456, "tor".to_string())));
    }

    #[test]
    fn no_candidate_present_yields_none() {
        let passwd = "root:x:0:0:root:/root:/bin/bash\n";
        assert_eq!(find_tor_user(passwd), None);
    }

    #[test]
    fn data_dir_is_conventional_path() {
        assert_eq!(data_dir("tor"), PathBuf::from("/var/lib/tor"));
    }
}
