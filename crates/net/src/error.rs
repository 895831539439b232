// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("namespace operation failed: {0}")]
    Exec(#[from] anon_shell::ExecError),

    #[error("step '{step}' failed: {reason}")]
    Step { step: &'static str, reason: String },
}

impl From<NetError> for anon_core::FaultError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::Exec(exec) => exec.into(),
            NetError::Step { step, reason } => {
                anon_core::FaultError::StepFault { step: step.to_string(), reason }
            }
        }
    }
}
