// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Tracing setup (SPEC_FULL.md ambient stack): an activity log carrying
//! every line and a security log carrying only the subset tagged
//! `target: "security"` (spec §6, "an activity log and a security log,
//! each line prefixed `[timestamp] [LEVEL] …`"). Both are append-only,
//! non-blocking appenders so a slow disk never stalls the orchestrator.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

/// Guards must be held for the process lifetime or buffered lines are lost
/// on drop; `main` binds the returned tuple to a local that outlives `run`.
pub fn init(activity_log: &Path, security_log: &Path) -> std::io::Result<(WorkerGuard, WorkerGuard)> {
    for path in [activity_log, security_log] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let activity_appender = tracing_appender::rolling::never(
        activity_log.parent().unwrap_or_else(|| Path::new(".")),
        activity_log.file_name().unwrap_or_default(),
    );
    let (activity_writer, activity_guard) = tracing_appender::non_blocking(activity_appender);

    let security_appender = tracing_appender::rolling::never(
        security_log.parent().unwrap_or_else(|| Path::new(".")),
        security_log.file_name().unwrap_or_default(),
    );
    let (security_writer, security_guard) = tracing_appender::non_blocking(security_appender);

    let env_filter = EnvFilter::try_from_env("ANONCTL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let activity_layer = tracing_subscriber::fmt::layer()
        .with_writer(activity_writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(env_filter);

    let security_layer = tracing_subscriber::fmt::layer()
        .with_writer(security_writer)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| metadata.target() == "security"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_ansi(true);

    tracing_subscriber::registry()
        .with(activity_layer)
        .with(security_layer)
        .with(stderr_layer)
        .init();

    Ok((activity_guard, security_guard))
}
