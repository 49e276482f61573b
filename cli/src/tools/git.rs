//! Git operations, scoped to a working tree with `-C`.

use std::path::PathBuf;

use anyhow::Result;

use crate::runner::CommandRunner;

use super::{require_success, stdout_text};

/// Git bound to one working tree.
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn dir_arg(&self) -> String {
        self.dir.display().to_string()
    }

    /// `git init`.
    ///
    /// # Errors
    ///
    /// Returns an error when git fails.
    pub async fn init(&self, runner: &impl CommandRunner) -> Result<()> {
        let dir = self.dir_arg();
        let output = runner.run("git", &["-C", &dir, "init", "--quiet"]).await?;
        require_success("git init", output)?;
        Ok(())
    }

    /// Whether the working tree has no staged or unstaged changes.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory is not a git repository.
    pub async fn is_clean(&self, runner: &impl CommandRunner) -> Result<bool> {
        let dir = self.dir_arg();
        let output = runner
            .run("git", &["-C", &dir, "status", "--porcelain"])
            .await?;
        let output = require_success("git status", output)?;
        Ok(stdout_text(&output).is_empty())
    }

    /// Stage everything and commit. A clean tree is a no-op so repeated runs
    /// stay idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error when staging or committing fails.
    pub async fn commit_all(&self, runner: &impl CommandRunner, message: &str) -> Result<()> {
        let dir = self.dir_arg();
        let output = runner.run("git", &["-C", &dir, "add", "-A"]).await?;
        require_success("git add", output)?;
        if self.is_clean(runner).await? {
            return Ok(());
        }
        let output = runner
            .run("git", &["-C", &dir, "commit", "--quiet", "-m", message])
            .await?;
        require_success("git commit", output)?;
        Ok(())
    }

}

/// Tag lines from `git ls-remote --tags <url>`, without cloning.
///
/// # Errors
///
/// Returns an error when the remote cannot be queried.
pub async fn ls_remote_tags(runner: &impl CommandRunner, url: &str) -> Result<String> {
    let output = runner.run("git", &["ls-remote", "--tags", url]).await?;
    let output = require_success("git ls-remote", output)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
