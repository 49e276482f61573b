//! Thin wrappers around the external binaries the CLI orchestrates.
//!
//! Each wrapper owns the argument shape for one tool. Working directories are
//! passed with the tool's own flag (`git -C`, `composer --working-dir`,
//! `wp --path`, `npm --prefix`) so no child process needs a cwd change.

pub mod composer;
pub mod git;
pub mod node;
pub mod remote;
pub mod wp;

use std::process::Output;

/// Error for a command that ran but exited non-zero, carrying the tool's own
/// diagnostics (stderr when present, stdout otherwise).
pub(crate) fn command_failed(what: &str, output: &Output) -> anyhow::Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    let detail = detail.trim();
    if detail.is_empty() {
        anyhow::anyhow!("{what} failed ({})", output.status)
    } else {
        anyhow::anyhow!("{what} failed ({}): {detail}", output.status)
    }
}

/// Trimmed stdout of a captured command.
pub(crate) fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Pass the output through when the command succeeded, or surface its
/// diagnostics as an error.
pub(crate) fn require_success(what: &str, output: Output) -> anyhow::Result<Output> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(command_failed(what, &output))
    }
}
