// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Minimal `$PATH` search, used to surface `ExternalToolMissing` before
//! spawning rather than relying on the OS's `ENOENT`.

use crate::ExecError;
use std::path::PathBuf;

/// Locate `program` on `$PATH`. Returns `Ok(())` if found (absolute paths
/// are passed straight through as "found").
pub fn which(program: &str) -> Result<(), ExecError> {
    if program.contains('/') {
        return if PathBuf::from(program).is_file() {
            Ok(())
        } else {
            Err(ExecError::NotFound { tool: program.to_string() })
        };
    }

    let path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Ok(());
        }
    }
    Err(ExecError::NotFound { tool: program.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_tool_known_to_exist_in_tests() {
        which("true").expect("coreutils' true should be on PATH in CI");
    }

    #[test]
    fn reports_missing_tool() {
        assert!(which("definitely-not-a-real-binary-xyz").is_err());
    }
}
