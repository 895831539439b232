// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Root-level integration specs (spec §8): scenarios and properties that
//! span more than one crate. The `anonctl` binary's own command surface
//! (spec §6: `--help`, mutual exclusion, privilege precondition) is
//! exercised in `crates/cli/tests/cli.rs`, alongside its own package so
//! `assert_cmd::Command::cargo_bin` resolves the right binary.
//!
//! Per-crate invariants that don't need cross-crate wiring (the
//! symlink-aware resolv capture, package name resolution, the
//! compensation stack's unwind order) already have unit coverage next to
//! their implementation and are not repeated here.

use anon_core::{
    Capabilities, DistroFamily, FirewallBackend, Mode, OrchestrationContext, PackageManager, Paths,
    RuntimeState,
};
use anon_engine::{EngineError, ProcessLock};
use anon_storage::{SnapshotStore, StateStore};
use tempfile::tempdir;

fn fake_capabilities() -> Capabilities {
    Capabilities {
        distro_family: DistroFamily::Debian,
        package_manager: PackageManager::Apt,
        firewall_backend: FirewallBackend::Modern,
        tor_uid: 1000,
        tor_user: "debian-tor".to_string(),
        tor_data_dir: "/var/lib/tor".into(),
        egress_iface: "eth0".to_string(),
        kernel_namespaces_supported: true,
    }
}

// ---------------------------------------------------------------------
// Property 5 (lock safety) + C2 (state store), exercised together the
// way a single anonctl invocation would: acquire the process lock, read
// and persist RuntimeState, release.
// ---------------------------------------------------------------------

#[test]
fn lock_contention_is_reported_with_the_holding_pid() {
    let dir = tempdir().expect("tempdir");
    let lock_path = dir.path().join("anonctl.lock");

    let first = ProcessLock::acquire(&lock_path).expect("first acquire succeeds");
    let second = ProcessLock::acquire(&lock_path);
    match second {
        Err(EngineError::LockFailed { held_by }) => {
            assert_eq!(held_by, std::process::id(), "lock file must record the holder's own pid");
        }
        other => panic!("expected LockFailed, got {other:?}"),
    }
    first.release();

    // Now that the holder has released, a fresh acquire must succeed.
    let third = ProcessLock::acquire(&lock_path).expect("lock is free after release");
    third.release();
}

#[test]
fn state_round_trips_through_paths_and_store() {
    let dir = tempdir().expect("tempdir");
    let paths = Paths::under(dir.path().to_path_buf());
    let store = StateStore::new(&paths.state_path);

    let mut state = store.load().expect("missing file yields defaults");
    assert_eq!(state, RuntimeState::default());

    state.anonymity_active = true;
    state.mode = Mode::Extreme;
    state.firewall_backend = FirewallBackend::Modern;
    store.save(&state).expect("save");

    let reloaded = store.load().expect("load");
    assert_eq!(state, reloaded);

    // Spec §8 scenario S5: a malicious/garbage line for a known key must
    // never override the prior valid value, and the file must still
    // parse as the same state otherwise.
    let mut content = std::fs::read_to_string(&paths.state_path).expect("read state file");
    content.push_str("CURRENT_MODE=$(rm -rf /)\n");
    std::fs::write(&paths.state_path, &content).expect("write tampered state");
    let tampered = store.load().expect("load tampered file");
    assert_eq!(tampered.mode, Mode::Extreme, "invalid value must not override prior valid mode");
    assert!(tampered.anonymity_active);
}

// ---------------------------------------------------------------------
// Scenario S6 (partial snapshot rejected) end-to-end: a snapshot
// directory missing its completion marker must be treated as absent by
// `restore`, which falls back to safe defaults rather than reading the
// partial data, and the core fault mapping must mark that outcome as a
// restore-triggering fault.
// ---------------------------------------------------------------------

#[tokio::test]
async fn restore_without_completion_marker_falls_back_to_safe_defaults() {
    let dir = tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());

    // Stage a snapshot directory with data but no `.complete` marker.
    let staging = dir.path().join("initial");
    tokio::fs::create_dir_all(&staging).await.expect("mkdir");
    tokio::fs::write(staging.join("sysctl.val"), b"1").await.expect("write");
    assert!(!store.is_valid("initial"), "a marker-less snapshot must never be valid");

    let result = store.restore("initial").await;
    assert!(result.is_err(), "restore must refuse partial data, not silently accept it");

    let fault = anon_core::FaultError::SnapshotInvalid;
    assert!(
        fault.triggers_emergency_restore(),
        "a snapshot-invalid fault must trigger the emergency-restore path"
    );
    assert!(!fault.remedy().is_empty(), "spec §7: every terminal fault names one remedial action");
}

#[tokio::test]
async fn safe_defaults_apply_is_idempotent_on_a_fresh_resolv_file() {
    let dir = tempdir().expect("tempdir");
    let resolv = dir.path().join("resolv.conf");
    tokio::fs::write(&resolv, "nameserver 10.200.1.1\n").await.expect("seed resolv");

    anon_storage::safe_defaults::apply(&resolv).await;
    anon_storage::safe_defaults::apply(&resolv).await;

    assert!(resolv.exists(), "safe-default restore must leave a usable resolver config behind");
}

// ---------------------------------------------------------------------
// C3 + explicit context (spec §9 "global mutable configuration ->
// explicit context"): constructing the context from scratch must not
// silently drift the fixed network topology across invocations.
// ---------------------------------------------------------------------

#[test]
fn orchestration_context_topology_is_fixed_regardless_of_capabilities() {
    let dir = tempdir().expect("tempdir");
    let paths = Paths::under(dir.path().to_path_buf());

    let ctx_a = OrchestrationContext::new(paths.clone(), fake_capabilities(), RuntimeState::default());
    let mut other_caps = fake_capabilities();
    other_caps.firewall_backend = FirewallBackend::Legacy;
    let ctx_b = OrchestrationContext::new(paths, other_caps, RuntimeState::default());

    assert_eq!(ctx_a.topology.ns_name, ctx_b.topology.ns_name);
    assert_eq!(ctx_a.topology.tor_ip, ctx_b.topology.tor_ip);
    assert_eq!(ctx_a.topology.host_ip, ctx_b.topology.host_ip);
}
