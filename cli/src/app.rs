//! Application context — unified state passed to every command handler.
//!
//! `AppContext` is constructed once in `Cli::run()` and passed as
//! `&AppContext` to all command handlers. Adding a new cross-cutting concern
//! (e.g. `--verbose`) requires only one field change here — zero command
//! signatures change.

use anyhow::{Context as _, Result};

use crate::output::OutputContext;
use crate::runner::TokioCommandRunner;

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Skip interactive prompts (also set by `CI` / `ORBIT_YES` env vars).
    pub yes: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Shared subprocess runner for all external tools.
    pub runner: TokioCommandRunner,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `ORBIT_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("ORBIT_YES").is_ok();
        let non_interactive = flags.yes || ci_env;

        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            runner: TokioCommandRunner::default(),
            non_interactive,
        }
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `ORBIT_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("reading confirmation")?;
        Ok(confirmed)
    }

    /// Ask the user for a line of input, trimmed and lowercased.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn input(&self, prompt: &str, default: &str) -> Result<String> {
        if self.non_interactive {
            return Ok(default.to_string());
        }
        let value: String = dialoguer::Input::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()
            .context("reading input")?;
        Ok(value.trim().to_lowercase())
    }

    /// Ask the user to pick one of `items`.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        if self.non_interactive {
            return Ok(default);
        }
        let choice = dialoguer::Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .context("reading selection")?;
        Ok(choice)
    }
}
