//! Version command

use anyhow::Result;

use crate::output::OutputContext;
use crate::version_gate::{self, VersionSource};

/// Run the version command. The plain form also reports whether a newer
/// release is available; `--json` stays offline for scripting.
///
/// # Errors
///
/// Returns an error when the compiled-in version is not valid semver.
pub async fn run(source: &impl VersionSource, ctx: &OutputContext, json: bool) -> Result<()> {
    let version = version_gate::current_version()?;

    if json {
        println!(r#"{{"version":"{version}"}}"#);
        return Ok(());
    }

    println!("orbit {version}");

    match source.latest().await {
        Ok(Some(latest)) if version_gate::update_required(&version, &latest) => {
            ctx.warn(&format!(
                "Update available: v{latest}. Run: cargo install --git {}",
                version_gate::RELEASE_REPOSITORY
            ));
        }
        Ok(Some(_)) => ctx.success("Up to date."),
        Ok(None) | Err(_) => ctx.warn("Could not detect the latest version."),
    }
    Ok(())
}
