// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Carries a process exit code out of a command handler so `main()` is the
//! only place that calls `std::process::exit`.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Build from a fault, appending its spec §7 remedial action.
    pub fn from_fault(fault: &anon_core::FaultError) -> Self {
        Self::new(1, format!("{fault} ({})", fault.remedy()))
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
