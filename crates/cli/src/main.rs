// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! anonctl: the privileged host-orchestrator CLI (spec §6). A thin flag
//! dispatcher over `anon-engine`'s `Orchestrator`; all mutation lives
//! there, this binary only wires capability detection, the process lock,
//! logging, and signal-triggered emergency restore around it.

mod commands;
mod components;
mod exit_error;
mod logging;
mod menu;
mod output;

use anon_core::{OrchestrationContext, Paths};
use anon_engine::{Orchestrator, ProcessLock};
use anon_storage::{SnapshotStore, StateStore};
use clap::Parser;
use std::process::ExitCode;
use tracing::{info, warn};

use exit_error::ExitError;
use output::OutputFormat;

/// Recognized flags are mutually exclusive; absence opens the interactive
/// menu (spec §6).
#[derive(Parser, Debug)]
#[command(name = "anonctl", version, about = "Whonix-style host anonymizer orchestrator")]
#[command(group(clap::ArgGroup::new("action").args(
    ["extreme", "partial", "disable", "status", "verify", "newid", "restore", "logs"],
).multiple(false)))]
struct Cli {
    /// Enable the extreme pipeline: firewall killswitch, sysctl hardening, MAC randomization.
    #[arg(long)]
    extreme: bool,
    /// Enable the partial pipeline: Tor + DNS lock, without the firewall killswitch.
    #[arg(long)]
    partial: bool,
    /// Clean teardown back to the initial snapshot.
    #[arg(long)]
    disable: bool,
    /// Print the status dashboard.
    #[arg(long)]
    status: bool,
    /// Run the ten-point verification suite.
    #[arg(long)]
    verify: bool,
    /// Request a new Tor identity (SIGNAL NEWNYM).
    #[arg(long)]
    newid: bool,
    /// Emergency restore to safe defaults, bypassing precondition checks.
    #[arg(long)]
    restore: bool,
    /// View the activity and security logs.
    #[arg(long)]
    logs: bool,
    /// Emit machine-readable JSON instead of text, where applicable.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            // spec §6: `--help`/`-h` exits 0; any other parse error
            // ("anything else") exits 1 (clap's own default is 2).
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{e}");
                    return ExitCode::SUCCESS;
                }
                _ => {
                    eprintln!("{e}");
                    return ExitCode::from(1);
                }
            }
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("anonctl: {e}");
            ExitCode::from(e.code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let paths = Paths::resolve();
    std::fs::create_dir_all(&paths.root).map_err(|e| ExitError::new(1, e.to_string()))?;
    let _guards = logging::init(&paths.activity_log, &paths.security_log)
        .map_err(|e| ExitError::new(1, format!("failed to initialize logging: {e}")))?;

    require_privileged()?;

    let lock = ProcessLock::acquire(&paths.lock_path)
        .map_err(|e| ExitError::from_fault(&e.into()))?;

    let result = dispatch(&cli, &paths).await;

    lock.release();
    result
}

async fn dispatch(cli: &Cli, paths: &Paths) -> Result<(), ExitError> {
    let capabilities = anon_probe::probe(None)
        .await
        .map_err(|fault| ExitError::from_fault(&fault))?;

    let state_store = StateStore::new(&paths.state_path);
    let state = state_store.load().map_err(|e| ExitError::new(1, e.to_string()))?;
    let ctx = OrchestrationContext::new(paths.clone(), capabilities, state);

    if !cli.extreme && !cli.partial && !cli.disable && !cli.status && !cli.verify && !cli.newid && !cli.restore
        && !cli.logs
    {
        let mut orchestrator = Orchestrator::new(ctx, SnapshotStore::new(&paths.snapshot_dir), state_store);
        return menu::run(&mut orchestrator, cli.format()).await;
    }

    if cli.status {
        return commands::status::run(&ctx, cli.format()).await;
    }
    if cli.verify {
        return commands::verify::run(&ctx, cli.format()).await;
    }
    if cli.newid {
        return commands::newid::run(&ctx).await;
    }
    if cli.logs {
        return commands::logs::run(&ctx.paths, cli.format());
    }

    let mut orchestrator = Orchestrator::new(ctx, SnapshotStore::new(&paths.snapshot_dir), state_store);

    if cli.extreme {
        return with_signal_guard(&mut orchestrator, true).await;
    }
    if cli.partial {
        return with_signal_guard(&mut orchestrator, false).await;
    }
    if cli.disable {
        return commands::lifecycle::disable(&mut orchestrator).await;
    }
    if cli.restore {
        return commands::lifecycle::restore(&mut orchestrator).await;
    }

    unreachable!("clap's ArgGroup guarantees exactly one action flag, or none")
}

/// Races the enable pipeline against a termination signal; on signal, the
/// in-flight pipeline future is dropped (cancelling it) and
/// `emergency_restore` runs fresh (spec §5 cancellation: "There is no
/// partial-cancellation. Once cancelled, the system returns to safe
/// defaults").
async fn with_signal_guard(orchestrator: &mut Orchestrator, extreme: bool) -> Result<(), ExitError> {
    enum Outcome {
        Completed(Result<(), ExitError>),
        Cancelled,
    }

    let outcome = tokio::select! {
        result = run_enable(orchestrator, extreme) => Outcome::Completed(result),
        _ = wait_for_termination() => Outcome::Cancelled,
    };

    match outcome {
        Outcome::Completed(result) => result,
        Outcome::Cancelled => {
            warn!("termination signal received; running emergency restore");
            if let Err(e) = orchestrator.emergency_restore().await {
                return Err(ExitError::from_fault(&e.into()));
            }
            Err(ExitError::new(1, "cancelled by signal; restored to safe defaults"))
        }
    }
}

async fn run_enable(orchestrator: &mut Orchestrator, extreme: bool) -> Result<(), ExitError> {
    if extreme {
        commands::lifecycle::extreme(orchestrator).await
    } else {
        commands::lifecycle::partial(orchestrator).await
    }
}

#[cfg(unix)]
#[allow(clippy::expect_used)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("SIGTERM handler installs");
    let mut int = signal(SignalKind::interrupt()).expect("SIGINT handler installs");
    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(unix)]
fn require_privileged() -> Result<(), ExitError> {
    if nix::unistd::Uid::effective().is_root() {
        info!("running as privileged user");
        Ok(())
    } else {
        Err(ExitError::from_fault(&anon_core::FaultError::PermissionFault))
    }
}

#[cfg(not(unix))]
fn require_privileged() -> Result<(), ExitError> {
    Err(ExitError::from_fault(&anon_core::FaultError::UnsupportedHost {
        reason: "anonctl requires a unix-like host".to_string(),
    }))
}
