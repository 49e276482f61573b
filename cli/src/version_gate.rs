//! Release gate: refuse to run when this binary is behind the latest tag.
//!
//! Site tooling that scaffolds projects and rewrites databases must not run
//! stale. Every orchestration command checks the released tags first and
//! aborts when an update is available; an unreachable remote only warns.

use anyhow::{Context, Result};
use semver::Version;

use crate::output::OutputContext;
use crate::runner::CommandRunner;
use crate::tools::git;

/// Repository whose tags define the released versions.
pub const RELEASE_REPOSITORY: &str = "https://github.com/eighteen73/orbit.git";

/// Set to any non-empty value (other than `0`) to skip the gate, for CI and
/// offline work.
pub const SKIP_ENV_VAR: &str = "ORBIT_SKIP_VERSION_CHECK";

/// Source of the latest released version, separated for test doubles.
#[allow(async_fn_in_trait)]
pub trait VersionSource {
    /// Latest released version, or `None` when the listing has no usable tag.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing cannot be fetched at all.
    async fn latest(&self) -> Result<Option<Version>>;
}

/// Production source: `git ls-remote --tags` against [`RELEASE_REPOSITORY`].
pub struct GitTags<R: CommandRunner> {
    runner: R,
    repository: String,
}

impl<R: CommandRunner> GitTags<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            repository: RELEASE_REPOSITORY.to_string(),
        }
    }
}

impl<R: CommandRunner> VersionSource for GitTags<R> {
    async fn latest(&self) -> Result<Option<Version>> {
        let listing = git::ls_remote_tags(&self.runner, &self.repository).await?;
        Ok(parse_latest_tag(&listing))
    }
}

/// The version compiled into this binary.
///
/// # Errors
///
/// Returns an error when the crate version is not valid semver, which only
/// a broken release process can produce.
pub fn current_version() -> Result<Version> {
    Version::parse(env!("CARGO_PKG_VERSION")).context("crate version is not valid semver")
}

/// Whether the installed version is behind the latest release.
#[must_use]
pub fn update_required(local: &Version, remote: &Version) -> bool {
    remote > local
}

/// Abort when this binary is behind the latest release.
///
/// An unreadable or tagless remote prints a warning and lets the command
/// continue; only a confirmed newer release blocks.
///
/// # Errors
///
/// Returns an error when an update is required.
pub async fn enforce(source: &impl VersionSource, output: &OutputContext) -> Result<()> {
    if skip_requested() {
        return Ok(());
    }
    let local = current_version()?;
    match source.latest().await {
        Ok(Some(remote)) if update_required(&local, &remote) => anyhow::bail!(
            "Update required (v{local} to v{remote}). Please run: cargo install --git {RELEASE_REPOSITORY}"
        ),
        Ok(Some(_)) => Ok(()),
        Ok(None) | Err(_) => {
            output.warn("Could not detect the latest version. Continuing with the current install.");
            Ok(())
        }
    }
}

fn skip_requested() -> bool {
    std::env::var(SKIP_ENV_VAR).is_ok_and(|v| !v.is_empty() && v != "0")
}

/// Highest semver among `ls-remote --tags` lines. Peeled refs (`^{}`), a
/// leading `v`, and non-semver tags are all tolerated.
fn parse_latest_tag(listing: &str) -> Option<Version> {
    listing
        .lines()
        .filter_map(|line| line.split("refs/tags/").nth(1))
        .filter(|tag| !tag.ends_with("^{}"))
        .filter_map(|tag| Version::parse(tag.trim().trim_start_matches('v')).ok())
        .max()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
