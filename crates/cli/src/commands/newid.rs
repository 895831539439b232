// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! `--newid`: request a fresh Tor circuit via `SIGNAL NEWNYM` (spec §4.7).

use anon_core::OrchestrationContext;

use crate::components;
use crate::exit_error::ExitError;

pub async fn run(ctx: &OrchestrationContext) -> Result<(), ExitError> {
    if !ctx.state.anonymity_active {
        return Err(ExitError::new(1, "anonymity is not active; nothing to rotate"));
    }
    let control = components::control_client(ctx);
    control.new_identity().await.map_err(|e| ExitError::from_fault(&e.into()))?;
    println!("requested a new Tor identity");
    Ok(())
}
