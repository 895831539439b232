// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anon-storage: atomic, symlink-aware persistence of host state (Snapshot
//! Store, spec §4.1) and the `key=value` RuntimeState file (spec §3, §6).
//!
//! Every write here goes through the same discipline: stage to a temp
//! location or a `.staging` directory, then a single atomic rename into
//! place, so a reader never observes a half-written file.

pub mod error;
pub mod resolv;
pub mod safe_defaults;
pub mod snapshot_store;
pub mod state_store;

pub use error::{SnapshotError, StateError};
pub use snapshot_store::{SnapshotCapture, SnapshotStore, SYSCTL_KEYS};
pub use state_store::StateStore;
