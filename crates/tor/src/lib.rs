// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anon-tor: Tor process supervision (spec §4.4 C6), configuration
//! rendering (spec §6), and control-port bootstrap polling / identity
//! rotation (spec §4.7 C14).

pub mod config;
pub mod control;
pub mod error;
pub mod supervisor;

pub use control::ControlClient;
pub use error::TorError;
pub use supervisor::TorSupervisor;
