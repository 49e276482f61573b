//! WP-CLI abstraction — enables test doubles for all `wp` commands.

use std::process::{Output, Stdio};

use anyhow::Result;

use crate::project::Project;
use crate::runner::CommandRunner;

use super::{require_success, stdout_text};

/// Abstraction over a located WP-CLI binary, bound to one WordPress install.
///
/// Every command carries a `--path=<project>/web/wp` argument, so the caller's
/// working directory never matters. The production implementation delegates
/// to the probed binary via a [`CommandRunner`].
#[allow(async_fn_in_trait)]
pub trait WpCli {
    /// Run a WP-CLI command and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned. A non-zero exit is
    /// reported through the returned [`Output`], not as an `Err`.
    async fn run(&self, args: &[&str]) -> Result<Output>;

    /// Run a WP-CLI command with stdin fed from `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Result<Output>;

    /// Spawn a WP-CLI command with piped stdout and the given stdin handle,
    /// for pipeline construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    fn spawn(&self, args: &[&str], stdin: Stdio) -> Result<tokio::process::Child>;
}

/// Production implementation — shells out to a located `wp` binary.
pub struct WpCliProcess<R: CommandRunner> {
    runner: R,
    program: String,
    path_arg: String,
}

impl<R: CommandRunner> WpCliProcess<R> {
    /// Locate a usable WP-CLI binary for the project.
    ///
    /// Prefers the composer-installed `vendor/bin/wp`, falling back to `wp`
    /// on PATH. Each candidate is probed with `cli version`, which succeeds
    /// without a WordPress install present.
    ///
    /// # Errors
    ///
    /// Returns an error when no candidate responds to the probe.
    pub async fn locate(runner: R, project: &Project) -> Result<Self> {
        let vendored = project.root().join("vendor").join("bin").join("wp");
        let candidates = [vendored.to_string_lossy().into_owned(), "wp".to_string()];
        for candidate in candidates {
            let probe = runner.run(&candidate, &["cli", "version"]).await;
            if matches!(&probe, Ok(output) if output.status.success()) {
                return Ok(Self::bound(runner, candidate, project));
            }
        }
        anyhow::bail!(
            "WP-CLI was not found. Install it globally or run `composer install` in the project first."
        )
    }

    /// Bind to a known binary without probing.
    pub fn bound(runner: R, program: String, project: &Project) -> Self {
        let path_arg = format!("--path={}", project.core_dir().display());
        Self {
            runner,
            program,
            path_arg,
        }
    }

    fn full_args<'a>(&'a self, args: &'a [&'a str]) -> Vec<&'a str> {
        let mut full = args.to_vec();
        full.push(&self.path_arg);
        full
    }
}

impl<R: CommandRunner> WpCli for WpCliProcess<R> {
    async fn run(&self, args: &[&str]) -> Result<Output> {
        self.runner.run(&self.program, &self.full_args(args)).await
    }

    async fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Result<Output> {
        self.runner
            .run_with_stdin(&self.program, &self.full_args(args), input)
            .await
    }

    fn spawn(&self, args: &[&str], stdin: Stdio) -> Result<tokio::process::Child> {
        self.runner
            .spawn(&self.program, &self.full_args(args), stdin)
    }
}

// ── Typed helpers ─────────────────────────────────────────────────────────────

/// Activation state of a plugin slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Active,
    Inactive,
    NotInstalled,
}

/// `wp config get <key> --type=constant`. `None` when the constant is absent
/// (wp-cli exits non-zero for unknown names).
///
/// # Errors
///
/// Returns an error if wp-cli cannot be spawned.
pub async fn config_get(wp: &impl WpCli, key: &str) -> Result<Option<String>> {
    let output = wp.run(&["config", "get", key, "--type=constant"]).await?;
    if !output.status.success() {
        return Ok(None);
    }
    let value = stdout_text(&output);
    Ok((!value.is_empty()).then_some(value))
}

/// `wp option update <name> <value>`.
///
/// # Errors
///
/// Returns an error when the update fails.
pub async fn option_update(wp: &impl WpCli, name: &str, value: &str) -> Result<()> {
    let output = wp.run(&["option", "update", name, value]).await?;
    require_success(&format!("wp option update {name}"), output)?;
    Ok(())
}

/// `wp option update <name> --format=json` with the value on stdin, for
/// structured options like serialized plugin settings.
///
/// # Errors
///
/// Returns an error when the update fails.
pub async fn option_update_json(wp: &impl WpCli, name: &str, json: &str) -> Result<()> {
    let output = wp
        .run_with_stdin(&["option", "update", name, "--format=json"], json.as_bytes())
        .await?;
    require_success(&format!("wp option update {name}"), output)?;
    Ok(())
}

/// Resolve a plugin's state via `wp plugin is-active` / `is-installed`.
///
/// # Errors
///
/// Returns an error if wp-cli cannot be spawned.
pub async fn plugin_status(wp: &impl WpCli, slug: &str) -> Result<PluginStatus> {
    let active = wp.run(&["plugin", "is-active", slug]).await?;
    if active.status.success() {
        return Ok(PluginStatus::Active);
    }
    let installed = wp.run(&["plugin", "is-installed", slug]).await?;
    if installed.status.success() {
        Ok(PluginStatus::Inactive)
    } else {
        Ok(PluginStatus::NotInstalled)
    }
}

/// Whether WordPress is installed (`wp core is-installed`).
///
/// # Errors
///
/// Returns an error if wp-cli cannot be spawned.
pub async fn core_is_installed(wp: &impl WpCli) -> Result<bool> {
    Ok(wp.run(&["core", "is-installed"]).await?.status.success())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
