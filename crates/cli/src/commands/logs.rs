// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! `--logs`: tail the activity and security logs (spec §6).

use anon_core::Paths;
use serde::Serialize;
use std::io::{BufRead, BufReader};

use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

const TAIL_LINES: usize = 200;

#[derive(Serialize)]
struct LogsOutput {
    activity: Vec<String>,
    security: Vec<String>,
}

pub fn run(paths: &Paths, format: OutputFormat) -> Result<(), ExitError> {
    let activity = tail(&paths.activity_log, TAIL_LINES).map_err(|e| ExitError::new(1, e.to_string()))?;
    let security = tail(&paths.security_log, TAIL_LINES).map_err(|e| ExitError::new(1, e.to_string()))?;

    let output = LogsOutput { activity, security };
    format_or_json(format, &output, || {
        println!("== activity log (last {TAIL_LINES} lines) ==");
        for line in &output.activity {
            println!("{line}");
        }
        println!("== security log (last {TAIL_LINES} lines) ==");
        for line in &output.security {
            println!("{line}");
        }
    })
    .map_err(|e| ExitError::new(1, e.to_string()))
}

fn tail(path: &std::path::Path, n: usize) -> std::io::Result<Vec<String>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e),
    };
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].to_vec())
}
