// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! The `anonctl` command surface (spec §6): flag recognition, mutual
//! exclusion, help/version exit codes, and the privileged-user
//! precondition (spec §7). Everything here runs the built binary rather
//! than calling into the library, so it also catches `clap` wiring bugs
//! a unit test on `Cli` alone would miss.

use assert_cmd::Command;
use tempfile::tempdir;

fn anonctl() -> Command {
    Command::cargo_bin("anonctl").expect("anonctl binary built")
}

#[test]
fn help_flag_exits_zero_and_prints_usage() {
    let output = anonctl().arg("--help").output().expect("run anonctl --help");
    assert!(output.status.success(), "--help must exit 0 per spec §6");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "help text should mention usage, got: {stdout}");
}

#[test]
fn version_flag_exits_zero() {
    let output = anonctl().arg("--version").output().expect("run anonctl --version");
    assert!(output.status.success(), "--version must exit 0 per spec §6");
}

#[test]
fn unrecognized_flag_exits_one() {
    // spec §6: "anything else -> error -> 1" (clap's own default is 2).
    let output = anonctl().arg("--not-a-real-flag").output().expect("run anonctl");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn mutually_exclusive_flags_are_rejected() {
    // spec §6: "Flags are mutually exclusive".
    let output = anonctl().args(["--status", "--verify"]).output().expect("run anonctl");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

/// Every action flag requires a privileged user (spec §7: fatal
/// immediately on startup). Skipped if the test happens to run as root,
/// since then the precondition this test targets doesn't hold.
#[test]
fn unprivileged_status_is_rejected() {
    if running_as_root() {
        return;
    }
    let dir = tempdir().expect("tempdir");
    let output = anonctl()
        .env("ANONCTL_ROOT", dir.path())
        .arg("--status")
        .output()
        .expect("run anonctl --status");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("privileged"), "expected a permission remedy, got: {stderr}");
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}
