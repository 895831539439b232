// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot '{0}' is absent or incomplete")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SnapshotError> for anon_core::FaultError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Invalid(_) => anon_core::FaultError::SnapshotInvalid,
            other => anon_core::FaultError::StepFault { step: "snapshot".to_string(), reason: other.to_string() },
        }
    }
}
