//! SSH access to the remote environment.

use std::process::{Output, Stdio};

use anyhow::Result;

use crate::error::RemoteError;
use crate::runner::CommandRunner;

use super::{command_failed, require_success};

/// One remote environment, addressed as `user@host:port`.
///
/// All commands run with `BatchMode=yes` so a missing key never degrades
/// into a password prompt that hangs a captured command.
#[derive(Debug, Clone)]
pub struct SshConnection {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl SshConnection {
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `user@host:path` form for rsync source/destination arguments.
    #[must_use]
    pub fn rsync_target(&self, path: &str) -> String {
        format!("{}@{}:{path}", self.user, self.host)
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-p".to_string(),
            self.port.to_string(),
            self.target(),
        ]
    }

    /// Probe the connection with a bare `exit`.
    ///
    /// # Errors
    ///
    /// Exit code 255 (ssh's own failure code) maps to
    /// [`RemoteError::Unreachable`]; any other non-zero exit surfaces the
    /// command's diagnostics.
    pub async fn check_reachable(&self, runner: &impl CommandRunner) -> Result<()> {
        let mut args = self.base_args();
        args.push("exit".to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = runner.run("ssh", &args).await?;
        if output.status.code() == Some(255) {
            return Err(RemoteError::Unreachable {
                user: self.user.clone(),
                host: self.host.clone(),
                port: self.port,
            }
            .into());
        }
        if !output.status.success() {
            return Err(command_failed("ssh probe", &output));
        }
        Ok(())
    }

    /// Run `command` on the remote host and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error when the command exits non-zero, carrying its
    /// diagnostics.
    pub async fn exec(&self, runner: &impl CommandRunner, command: &str) -> Result<Output> {
        let mut args = self.base_args();
        args.push(command.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = runner.run("ssh", &args).await?;
        require_success(&format!("remote command `{command}`"), output)
    }

    /// Run `command` on the remote host without failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error only when ssh itself cannot be spawned.
    pub async fn exec_unchecked(
        &self,
        runner: &impl CommandRunner,
        command: &str,
    ) -> Result<Output> {
        let mut args = self.base_args();
        args.push(command.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        runner.run("ssh", &args).await
    }

    /// Spawn `command` on the remote host with piped stdout, for local
    /// pipeline construction.
    ///
    /// # Errors
    ///
    /// Returns an error if ssh cannot be spawned.
    pub fn spawn(
        &self,
        runner: &impl CommandRunner,
        command: &str,
    ) -> Result<tokio::process::Child> {
        let mut args = self.base_args();
        args.push(command.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        runner.spawn("ssh", &args, Stdio::null())
    }

    /// Find a usable WP-CLI binary on the remote host.
    ///
    /// Probes the composer-installed binary under the project first, then
    /// PATH and the common global location, each with `cli version`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::WpCliNotFound`] when no candidate responds.
    pub async fn locate_remote_wp(
        &self,
        runner: &impl CommandRunner,
        remote_path: &str,
    ) -> Result<String> {
        let candidates = [
            format!("{remote_path}/vendor/bin/wp"),
            "wp".to_string(),
            "/usr/local/bin/wp".to_string(),
        ];
        for candidate in candidates {
            let probe = self
                .exec_unchecked(runner, &format!("{candidate} cli version"))
                .await?;
            if probe.status.success() {
                return Ok(candidate);
            }
        }
        Err(RemoteError::WpCliNotFound {
            path: remote_path.to_string(),
        }
        .into())
    }
}
