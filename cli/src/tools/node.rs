//! npm operations for theme asset installs.

use std::path::Path;

use anyhow::Result;

use crate::runner::CommandRunner;

/// `npm install --prefix <dir>`, inherited stdio so npm renders its own
/// progress.
///
/// # Errors
///
/// Returns an error when npm exits non-zero.
pub async fn npm_install(runner: &impl CommandRunner, dir: &Path) -> Result<()> {
    let dir_arg = dir.display().to_string();
    let status = runner
        .run_status("npm", &["install", "--prefix", &dir_arg])
        .await?;
    anyhow::ensure!(status.success(), "npm install failed ({status})");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::testing::RecordingRunner;

    #[tokio::test]
    async fn test_npm_install_targets_prefix_dir() {
        let runner = RecordingRunner::ok();
        npm_install(&runner, Path::new("/srv/site/web/app/themes/pulsar"))
            .await
            .expect("install");
        let calls = runner.recorded();
        assert_eq!(calls[0].0, "npm");
        assert_eq!(
            calls[0].1,
            vec!["install", "--prefix", "/srv/site/web/app/themes/pulsar"]
        );
    }

    #[tokio::test]
    async fn test_npm_install_failure_is_error() {
        let runner = RecordingRunner::with(1, "");
        let result = npm_install(&runner, Path::new("/srv/site")).await;
        assert!(result.is_err());
    }
}
