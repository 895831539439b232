// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TorError {
    #[error(transparent)]
    Exec(#[from] anon_shell::ExecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("control port protocol error: {0}")]
    Control(String),

    #[error("bootstrap did not complete within {timeout_secs}s")]
    BootstrapTimeout { timeout_secs: u64 },

    #[error("step '{step}' failed: {reason}")]
    Step { step: &'static str, reason: String },
}

impl From<TorError> for anon_core::FaultError {
    fn from(e: TorError) -> Self {
        match e {
            TorError::Exec(exec) => exec.into(),
            TorError::BootstrapTimeout { timeout_secs } => {
                anon_core::FaultError::BootstrapTimeout { timeout_secs }
            }
            TorError::Io(io) => anon_core::FaultError::StepFault {
                step: "tor_io".to_string(),
                reason: io.to_string(),
            },
            TorError::Control(reason) => {
                anon_core::FaultError::StepFault { step: "tor_control".to_string(), reason }
            }
            TorError::Step { step, reason } => {
                anon_core::FaultError::StepFault { step: step.to_string(), reason }
            }
        }
    }
}
