// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! `--verify`: the ten-point check (spec §4.8). Always exits 1 if any
//! check failed, 0 otherwise, even in JSON mode.

use anon_core::{Mode, OrchestrationContext};
use anon_engine::{CheckStatus, Verifier};
use serde::Serialize;

use crate::components;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Serialize)]
struct VerifyOutput {
    pass: usize,
    warn: usize,
    fail: usize,
    checks: Vec<CheckLine>,
}

#[derive(Serialize)]
struct CheckLine {
    name: &'static str,
    status: &'static str,
    detail: String,
}

pub async fn run(ctx: &OrchestrationContext, format: OutputFormat) -> Result<(), ExitError> {
    let namespace = components::namespace(ctx);
    let tor = components::tor_supervisor(ctx);
    let control = components::control_client(ctx);
    let firewall =
        components::firewall(ctx).map_err(|e| ExitError::from_fault(&anon_core::FaultError::from(e)))?;

    let verifier = Verifier {
        tor: &tor,
        control: &control,
        namespace: &namespace,
        firewall: &firewall,
        resolv_path: std::path::Path::new("/etc/resolv.conf"),
        ns_name: ctx.topology.ns_name,
        mac_randomized: ctx.state.mode == Mode::Extreme,
    };
    let report = verifier.verify().await;

    let output = VerifyOutput {
        pass: report.pass_count(),
        warn: report.warn_count(),
        fail: report.fail_count(),
        checks: report
            .checks
            .iter()
            .map(|c| CheckLine {
                name: c.name,
                status: match c.status {
                    CheckStatus::Pass => "pass",
                    CheckStatus::Warn => "warn",
                    CheckStatus::Fail => "fail",
                },
                detail: c.detail.clone(),
            })
            .collect(),
    };

    format_or_json(format, &output, || {
        println!("anonctl verify: {} pass, {} warn, {} fail", output.pass, output.warn, output.fail);
        for check in &output.checks {
            println!("  [{:>4}] {:<20} {}", check.status, check.name, check.detail);
        }
    })
    .map_err(|e| ExitError::new(1, e.to_string()))?;

    if report.fail_count() > 0 {
        return Err(ExitError::new(1, format!("{} check(s) failed", report.fail_count())));
    }
    Ok(())
}
