// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! `--extreme`, `--partial`, `--disable`, `--restore` (spec §6). Any fault
//! surfacing after the initial snapshot triggers `emergency_restore` before
//! the process exits non-zero (spec §7 propagation policy).

use anon_engine::Orchestrator;
use tracing::{error, warn};

use crate::exit_error::ExitError;

pub async fn extreme(orchestrator: &mut Orchestrator) -> Result<(), ExitError> {
    run_enable(orchestrator, true).await
}

pub async fn partial(orchestrator: &mut Orchestrator) -> Result<(), ExitError> {
    run_enable(orchestrator, false).await
}

async fn run_enable(orchestrator: &mut Orchestrator, extreme: bool) -> Result<(), ExitError> {
    let result =
        if extreme { orchestrator.enable_extreme().await } else { orchestrator.enable_partial().await };

    match result {
        Ok(()) => {
            println!("anonymity pipeline engaged ({})", if extreme { "extreme" } else { "partial" });
            Ok(())
        }
        Err(e) => {
            let fault = anon_core::FaultError::from(e);
            if fault.triggers_emergency_restore() {
                tracing::event!(target: "security", tracing::Level::WARN, error = %fault, "enable pipeline faulted, running emergency restore");
                if let Err(restore_err) = orchestrator.emergency_restore().await {
                    error!(error = %restore_err, "emergency restore itself failed");
                }
            }
            Err(ExitError::from_fault(&fault))
        }
    }
}

pub async fn disable(orchestrator: &mut Orchestrator) -> Result<(), ExitError> {
    orchestrator.disable().await.map_err(|e| ExitError::from_fault(&e.into())).map(|()| {
        println!("anonymity disabled, host restored");
    })
}

pub async fn restore(orchestrator: &mut Orchestrator) -> Result<(), ExitError> {
    match orchestrator.emergency_restore().await {
        Ok(()) => {
            println!("emergency restore completed");
            Ok(())
        }
        Err(e) => {
            warn!("emergency restore fell back to safe defaults");
            Err(ExitError::from_fault(&e.into()))
        }
    }
}
