// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! anon-shell: bounded, validated execution of the host's network tooling
//! (`ip`, `nft`, `iptables`, `tor`, `systemctl`, `nmcli`, `resolvectl`…).
//!
//! Design note (spec §9, "Shelling-out to external tools"): every external
//! call is wrapped so that it (i) validates its inputs, (ii) bounds runtime
//! to the 2-second timeout guard (spec §4.1, §5) — callers needing a longer
//! bound (e.g. the 180s bootstrap wait) pass an explicit override —
//! (iii) captures stderr, (iv) surfaces the exit code as a typed fault.

mod error;
mod which;

pub use error::ExecError;
pub use which::which;

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// The default syscall/process timeout guard mandated by spec §4.1 and §5:
/// "no syscall may block longer than 2 seconds".
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Validate that an argument contains no shell metacharacters. All commands
/// in this crate are executed via `tokio::process::Command` directly
/// (never through `sh -c`), so this is a defense-in-depth check against
/// accidental injection via interpolated arguments (e.g. interface names
/// read from `/sys`).
pub fn validate_arg(arg: &str) -> Result<(), ExecError> {
    const FORBIDDEN: &[char] = &[';', '|', '&', '$', '`', '\n', '\r'];
    if arg.chars().any(|c| FORBIDDEN.contains(&c)) {
        return Err(ExecError::InvalidArgument { arg: arg.to_string() });
    }
    Ok(())
}

/// Run `program args...` with a bounded timeout, returning the captured
/// output on success and a typed [`ExecError`] on any failure mode.
///
/// This is the sole process-spawning primitive in the codebase; every
/// higher-level adapter (namespace, firewall, tor, dns, sysctl, mac) goes
/// through this function so timeout/validation/error-typing are applied
/// uniformly.
pub async fn run(program: &str, args: &[&str], timeout: Duration) -> Result<Output, ExecError> {
    for arg in args {
        validate_arg(arg)?;
    }

    which(program)?;

    debug!(program, ?args, "executing external tool");

    let fut = Command::new(program).args(args).output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(output)) => {
            if output.status.success() {
                Ok(output)
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(program, code = output.status.code(), %stderr, "external tool exited non-zero");
                Err(ExecError::NonZeroExit {
                    program: program.to_string(),
                    code: output.status.code().unwrap_or(-1),
                    stderr,
                })
            }
        }
        Ok(Err(io_err)) => Err(ExecError::Io { program: program.to_string(), source: io_err }),
        Err(_elapsed) => Err(ExecError::Timeout { program: program.to_string(), bound_secs: timeout.as_secs() }),
    }
}

/// Run with the default 2-second timeout.
pub async fn run_checked(program: &str, args: &[&str]) -> Result<Output, ExecError> {
    run(program, args, DEFAULT_TIMEOUT).await
}

/// Run but treat a non-zero exit as success — used for idempotent teardown
/// calls where "already absent" is an acceptable outcome (spec §4.2
/// idempotence: "`disengage` must succeed even when rules are already
/// absent").
pub async fn run_best_effort(program: &str, args: &[&str]) {
    match run_checked(program, args).await {
        Ok(_) => {}
        Err(e) => debug!(program, ?args, error = %e, "best-effort command did not succeed"),
    }
}

/// Extract stdout as a lossily-decoded UTF-8 string.
pub fn stdout_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_shell_metacharacters() {
        let err = validate_arg("10.0.0.1; rm -rf /").unwrap_err();
        assert!(matches!(err, ExecError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn accepts_plain_arguments() {
        assert!(validate_arg("eth0").is_ok());
        assert!(validate_arg("10.200.1.0/24").is_ok());
    }

    #[tokio::test]
    async fn missing_tool_is_typed_error() {
        let err = run_checked("definitely-not-a-real-binary-xyz", &[]).await.unwrap_err();
        assert!(matches!(err, ExecError::NotFound { .. }));
    }

    #[tokio::test]
    async fn true_and_false_map_to_success_and_nonzero() {
        run_checked("true", &[]).await.expect("true always succeeds");
        let err = run_checked("false", &[]).await.unwrap_err();
        assert!(matches!(err, ExecError::NonZeroExit { code: 1, .. }));
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let err = run("sleep", &["5"], Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }
}
