// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Distribution family detection from `/etc/os-release`.

use anon_core::DistroFamily;

pub async fn detect() -> DistroFamily {
    let content = match tokio::fs::read_to_string("/etc/os-release").await {
        Ok(c) => c,
        Err(_) => return DistroFamily::Unknown,
    };
    from_os_release(&content)
}

pub(crate) fn from_os_release(content: &str) -> DistroFamily {
    let mut id = String::new();
    let mut id_like = String::new();
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("ID=") {
            id = v.trim_matches('"').to_string();
        } else if let Some(v) = line.strip_prefix("ID_LIKE=") {
            id_like = v.trim_matches('"').to_string();
        }
    }
    let haystack = format!("{id} {id_like}").to_lowercase();

    if haystack.contains("debian") || haystack.contains("ubuntu") {
        DistroFamily::Debian
    } else if haystack.contains("arch") {
        DistroFamily::Arch
    } else if haystack.contains("rhel") || haystack.contains("fedora") || haystack.contains("centos") {
        DistroFamily::Rhel
    } else {
        DistroFamily::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        debian = { "ID=debian\n", DistroFamily::Debian },
        ubuntu = { "ID=ubuntu\nID_LIKE=debian\n", DistroFamily::Debian },
        arch = { "ID=arch\n", DistroFamily::Arch },
        fedora = { "ID=fedora\nID_LIKE=\"fedora\"\n", DistroFamily::Rhel },
        rhel_like = { "ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n", DistroFamily::Rhel },
        unknown = { "ID=void\n", DistroFamily::Unknown },
    )]
    fn maps_os_release_to_family(content: &str, expected: DistroFamily) {
        assert_eq!(from_os_release(content), expected);
    }
}
