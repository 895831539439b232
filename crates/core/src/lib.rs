// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anon-core: shared data model, error kinds, and clock abstraction for the
//! anonctl host orchestrator.

pub mod clock;
pub mod context;
pub mod error;
pub mod killswitch;
pub mod paths;
pub mod snapshot;
pub mod state;
pub mod topology;
pub mod watchdog;

pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{Capabilities, OrchestrationContext, PackageManager};
pub use error::FaultError;
pub use killswitch::{KillswitchRules, TorEndpoint};
pub use paths::Paths;
pub use snapshot::{FirewallBlob, ResolvState, ServiceRecord, ServiceState, ServiceStatus, Snapshot};
pub use state::{DistroFamily, FirewallBackend, Mode, RuntimeState};
pub use topology::NamespaceTopology;
pub use watchdog::{AlertCategory, WatchdogAlert};
