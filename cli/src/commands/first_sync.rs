//! `orbit first-sync` — one-time bootstrap before `orbit sync` can run.
//!
//! A fresh checkout has no database, and WP-CLI refuses most commands until
//! WordPress is installed. A throwaway install with placeholder credentials
//! unblocks it; the real content arrives with the sync that follows.

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::sync::{SyncPlan, sync_project};
use crate::project::Project;
use crate::settings;
use crate::tools::wp::{self, WpCli, WpCliProcess};

const ALREADY_INSTALLED: &str = "WordPress is already installed. Use `orbit sync` instead.";

/// Run `orbit first-sync`.
///
/// # Errors
///
/// Returns an error when this is not a WordPress checkout, when WordPress is
/// already installed, or when the sync itself fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let project = Project::current()?;

    // A production checkout must be refused before the throwaway install
    // writes anything. The sync flow repeats the full check afterwards.
    let early_tag = settings::environment_tag_early(&project)?;
    if early_tag.is_some() {
        settings::ensure_syncable_environment(early_tag.as_deref())?;
    }

    let wp = WpCliProcess::locate(app.runner, &project).await?;

    bootstrap_install(&wp).await?;
    app.output
        .info("Placeholder install created; starting the first sync.");

    sync_project(&project, SyncPlan::everything(), app).await
}

/// The throwaway install. Placeholder credentials are overwritten by the
/// database fetch immediately afterwards.
async fn bootstrap_install(wp: &impl WpCli) -> Result<()> {
    let version = wp.run(&["core", "version"]).await?;
    anyhow::ensure!(version.status.success(), "Not a WordPress directory");

    anyhow::ensure!(!wp::core_is_installed(wp).await?, ALREADY_INSTALLED);

    let install = wp
        .run(&[
            "core",
            "install",
            "--url=example.com",
            "--title=Example",
            "--admin_user=admin",
            "--admin_password=weakpassword",
            "--admin_email=admin@example.com",
            "--skip-email",
        ])
        .await?;

    if install.status.success() {
        return Ok(());
    }

    let noise = format!(
        "{}{}",
        String::from_utf8_lossy(&install.stdout),
        String::from_utf8_lossy(&install.stderr)
    );
    if noise.contains("already installed") {
        anyhow::bail!(ALREADY_INSTALLED);
    }
    anyhow::bail!("WordPress could not be installed. Please check your .env")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::wp::testing::StubWp;

    #[tokio::test]
    async fn test_bootstrap_requires_wordpress_directory() {
        let wp = StubWp::new().respond(&["core", "version"], 1, "");
        let err = bootstrap_install(&wp).await.expect_err("should fail");
        assert!(err.to_string().contains("Not a WordPress directory"));
    }

    #[tokio::test]
    async fn test_bootstrap_refuses_installed_site() {
        let wp = StubWp::new()
            .respond(&["core", "version"], 0, "6.7.1\n")
            .respond(&["core", "is-installed"], 0, "");
        let err = bootstrap_install(&wp).await.expect_err("should fail");
        assert!(err.to_string().contains("orbit sync"), "got: {err}");
    }

    #[tokio::test]
    async fn test_bootstrap_detects_install_race_from_output() {
        let wp = StubWp::new()
            .respond(&["core", "version"], 0, "6.7.1\n")
            .respond(&["core", "is-installed"], 1, "");
        // The install command is not stubbed, so the double answers with its
        // "unexpected" marker; stub it explicitly instead.
        let wp = stub_install(wp, 1, "Error: WordPress is already installed.");
        let err = bootstrap_install(&wp).await.expect_err("should fail");
        assert!(err.to_string().contains("orbit sync"), "got: {err}");
    }

    #[tokio::test]
    async fn test_bootstrap_other_install_failures_point_at_dotenv() {
        let wp = StubWp::new()
            .respond(&["core", "version"], 0, "6.7.1\n")
            .respond(&["core", "is-installed"], 1, "");
        let wp = stub_install(wp, 1, "Error: Can't connect to the database.");
        let err = bootstrap_install(&wp).await.expect_err("should fail");
        assert!(err.to_string().contains("check your .env"), "got: {err}");
    }

    #[tokio::test]
    async fn test_bootstrap_happy_path_installs_with_placeholders() {
        let wp = StubWp::new()
            .respond(&["core", "version"], 0, "6.7.1\n")
            .respond(&["core", "is-installed"], 1, "");
        let wp = stub_install(wp, 0, "Success: WordPress installed successfully.");
        bootstrap_install(&wp).await.expect("bootstrap");
        let install = wp
            .recorded()
            .into_iter()
            .find(|call| call.get(1).map(String::as_str) == Some("install"))
            .expect("install call");
        assert!(install.contains(&"--skip-email".to_string()));
        assert!(install.contains(&"--url=example.com".to_string()));
    }

    fn stub_install(wp: StubWp, code: i32, message: &str) -> StubWp {
        wp.respond(
            &[
                "core",
                "install",
                "--url=example.com",
                "--title=Example",
                "--admin_user=admin",
                "--admin_password=weakpassword",
                "--admin_email=admin@example.com",
                "--skip-email",
            ],
            code,
            message,
        )
    }
}
