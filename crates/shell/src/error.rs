// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

use thiserror::Error;

/// Typed faults from running an external tool (spec §7, §9).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("required tool '{tool}' not found in PATH")]
    NotFound { tool: String },

    #[error("invalid argument contains disallowed characters: {arg:?}")]
    InvalidArgument { arg: String },

    #[error("'{program}' timed out after {bound_secs}s")]
    Timeout { program: String, bound_secs: u64 },

    #[error("'{program}' exited with code {code}: {stderr}")]
    NonZeroExit { program: String, code: i32, stderr: String },

    #[error("failed to spawn '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ExecError> for anon_core::FaultError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::NotFound { tool } => anon_core::FaultError::ExternalToolMissing { tool },
            ExecError::Timeout { program, bound_secs } => {
                anon_core::FaultError::Transient { op: program, bound_secs }
            }
            other => anon_core::FaultError::StepFault { step: "exec".to_string(), reason: other.to_string() },
        }
    }
}
