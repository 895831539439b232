// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fault(#[from] anon_core::FaultError),

    #[error("failed to acquire the system lock: another instance holds it (pid {held_by})")]
    LockFailed { held_by: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for anon_core::FaultError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Fault(f) => f,
            EngineError::LockFailed { held_by } => anon_core::FaultError::LockContention { held_by },
            EngineError::Io(io) => {
                anon_core::FaultError::StepFault { step: "io".to_string(), reason: io.to_string() }
            }
        }
    }
}
