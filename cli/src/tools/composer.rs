//! Composer operations, scoped with `--working-dir`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::runner::CommandRunner;

use super::require_success;

/// Create a new project from a composer template package.
///
/// `branch` selects a template branch by passing `dev-<branch>` as the
/// version argument; otherwise the default branch at `--stability=dev` is
/// used. Runs with inherited stdio so composer's own progress is visible.
///
/// # Errors
///
/// Returns an error when composer exits non-zero.
pub async fn create_project(
    runner: &impl CommandRunner,
    package: &str,
    dir: &Path,
    branch: Option<&str>,
) -> Result<()> {
    let dir_arg = dir.display().to_string();
    let mut args = vec!["create-project", "--stability=dev", package, &dir_arg];
    let version;
    if let Some(branch) = branch {
        version = format!("dev-{branch}");
        args.push(&version);
    }
    let status = runner.run_status("composer", &args).await?;
    anyhow::ensure!(status.success(), "composer create-project failed ({status})");
    Ok(())
}

/// Composer bound to one project directory.
pub struct Composer {
    dir: PathBuf,
}

impl Composer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn working_dir_arg(&self) -> String {
        format!("--working-dir={}", self.dir.display())
    }

    /// `composer update --quiet`. No timeout since dependency resolution can
    /// run for minutes; composer's own errors stay visible on stderr.
    ///
    /// # Errors
    ///
    /// Returns an error when composer exits non-zero.
    pub async fn update(&self, runner: &impl CommandRunner) -> Result<()> {
        let working_dir = self.working_dir_arg();
        let status = runner
            .run_status("composer", &["update", "--quiet", &working_dir])
            .await?;
        anyhow::ensure!(status.success(), "composer update failed ({status})");
        Ok(())
    }

    /// `composer require <packages…> --quiet`.
    ///
    /// # Errors
    ///
    /// Returns an error when composer exits non-zero.
    pub async fn require(&self, runner: &impl CommandRunner, packages: &[&str]) -> Result<()> {
        let working_dir = self.working_dir_arg();
        let mut args = vec!["require"];
        args.extend_from_slice(packages);
        args.push("--quiet");
        args.push(&working_dir);
        let status = runner.run_status("composer", &args).await?;
        anyhow::ensure!(
            status.success(),
            "composer require {} failed ({status})",
            packages.join(" ")
        );
        Ok(())
    }

    /// `composer require --dev <packages…> --quiet`.
    ///
    /// # Errors
    ///
    /// Returns an error when composer exits non-zero.
    pub async fn require_dev(&self, runner: &impl CommandRunner, packages: &[&str]) -> Result<()> {
        let working_dir = self.working_dir_arg();
        let mut args = vec!["require", "--dev"];
        args.extend_from_slice(packages);
        args.push("--quiet");
        args.push(&working_dir);
        let status = runner.run_status("composer", &args).await?;
        anyhow::ensure!(
            status.success(),
            "composer require --dev {} failed ({status})",
            packages.join(" ")
        );
        Ok(())
    }

    /// `composer config <args…>`, captured.
    ///
    /// # Errors
    ///
    /// Returns an error when composer exits non-zero.
    pub async fn config(&self, runner: &impl CommandRunner, args: &[&str]) -> Result<()> {
        let working_dir = self.working_dir_arg();
        let mut full = vec!["config"];
        full.extend_from_slice(args);
        full.push(&working_dir);
        let output = runner.run("composer", &full).await?;
        require_success("composer config", output)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::testing::RecordingRunner;

    #[tokio::test]
    async fn test_create_project_default_branch_args() {
        let runner = RecordingRunner::ok();
        create_project(&runner, "eighteen73/nebula", Path::new("/tmp/site"), None)
            .await
            .expect("create");
        let calls = runner.recorded();
        assert_eq!(
            calls[0].1,
            vec!["create-project", "--stability=dev", "eighteen73/nebula", "/tmp/site"]
        );
    }

    #[tokio::test]
    async fn test_create_project_branch_appends_dev_version() {
        let runner = RecordingRunner::ok();
        create_project(
            &runner,
            "eighteen73/nebula",
            Path::new("/tmp/site"),
            Some("feature/blocks"),
        )
        .await
        .expect("create");
        let calls = runner.recorded();
        assert_eq!(calls[0].1.last().map(String::as_str), Some("dev-feature/blocks"));
    }

    #[tokio::test]
    async fn test_create_project_failure_is_error() {
        let runner = RecordingRunner::with(1, "");
        let result = create_project(&runner, "eighteen73/nebula", Path::new("/tmp/site"), None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_require_includes_packages_quiet_and_working_dir() {
        let runner = RecordingRunner::ok();
        let composer = Composer::new("/srv/site");
        composer
            .require(&runner, &["eighteen73-plugin/kinsta-mu-plugins"])
            .await
            .expect("require");
        let calls = runner.recorded();
        assert_eq!(
            calls[0].1,
            vec![
                "require",
                "eighteen73-plugin/kinsta-mu-plugins",
                "--quiet",
                "--working-dir=/srv/site",
            ]
        );
    }

    #[tokio::test]
    async fn test_require_dev_places_dev_flag_before_packages() {
        let runner = RecordingRunner::ok();
        let composer = Composer::new("/srv/site");
        composer
            .require_dev(&runner, &["wpackagist-plugin/spatie-ray"])
            .await
            .expect("require dev");
        let calls = runner.recorded();
        assert_eq!(
            calls[0].1,
            vec![
                "require",
                "--dev",
                "wpackagist-plugin/spatie-ray",
                "--quiet",
                "--working-dir=/srv/site",
            ]
        );
    }

    #[tokio::test]
    async fn test_config_scopes_to_working_dir() {
        let runner = RecordingRunner::ok();
        let composer = Composer::new("/srv/site");
        composer
            .config(&runner, &["repositories.eighteen73", "composer", "https://example.com"])
            .await
            .expect("config");
        let calls = runner.recorded();
        assert_eq!(calls[0].0, "composer");
        assert_eq!(
            calls[0].1.last().map(String::as_str),
            Some("--working-dir=/srv/site")
        );
    }
}
