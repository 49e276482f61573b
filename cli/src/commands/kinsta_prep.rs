//! `orbit kinsta-prep` — ready a site for Kinsta hosting.
//!
//! Installs `kinsta-mu-plugins` through composer and writes the Kinsta
//! constants into the project config. Safe to re-run: the package repository
//! and the config block are only added when missing. Requires a clean git
//! tree so the machine-applied change lands as one commit.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::app::AppContext;
use crate::project::{self, Project};
use crate::tools::composer::Composer;
use crate::tools::git::Git;
use crate::tools::require_success;
use crate::tools::wp::{WpCli, WpCliProcess};

const KINSTA_PACKAGE: &str = "eighteen73-plugin/kinsta-mu-plugins";
const PACKAGE_REPOSITORY: &str = "https://code.eighteen73.co.uk/pkg/wordpress";
const MANUAL_INSTALL_URL: &str = "https://kinsta.com/docs/wordpress-hosting/kinsta-mu-plugin/";

/// Current and legacy hostnames for the in-house package repository.
const REPOSITORY_PATTERN: &str = r"^https://code\.(eighteen73|orphans)\.co\.uk/pkg/wordpress$";

const KINSTA_CONSTANTS: &[&str] = &[
    "KINSTA_CDN_USERDIRS",
    "KINSTAMU_CUSTOM_MUPLUGIN_URL",
    "KINSTAMU_CAPABILITY",
    "KINSTAMU_WHITELABEL",
];

/// Run `orbit kinsta-prep`.
///
/// # Errors
///
/// Returns an error when the directory is not a composer-managed WordPress
/// project, the git tree is dirty, or any tool invocation fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let project = Project::current()?;
    let runner = &app.runner;
    let ctx = &app.output;

    // A working `wp core version` confirms `composer install` has been run.
    let wp = WpCliProcess::locate(app.runner, &project).await?;
    let output = wp.run(&["core", "version"]).await?;
    require_success("wp core version", output)
        .map_err(|_| anyhow::anyhow!("Not a WordPress directory"))?;

    let git = Git::new(project.root());
    anyhow::ensure!(
        git.is_clean(runner).await?,
        "The Git repo must not have any uncommitted code. Please commit/stash your changes then try again."
    );

    anyhow::ensure!(
        has_wordpress_package(project.root())?,
        "Could not install the plugin. Please do it manually using {MANUAL_INSTALL_URL}"
    );

    let composer = Composer::new(project.root());
    if !has_package_repository(project.root())? {
        composer
            .config(runner, &["repositories.eighteen73", "composer", PACKAGE_REPOSITORY])
            .await?;
    }
    composer.require(runner, &[KINSTA_PACKAGE]).await?;

    match write_kinsta_config(&project)? {
        ConfigOutcome::Written => ctx.info("Kinsta config added."),
        ConfigOutcome::AlreadyPresent => {
            ctx.info("Config already exists so we'll leave it untouched.");
        }
        ConfigOutcome::NoConfigFile => {
            ctx.warn(&format!(
                "No config file found; add the Kinsta constants manually ({MANUAL_INSTALL_URL})."
            ));
        }
    }

    git.commit_all(runner, "Add kinsta-mu-plugins").await?;
    ctx.success("Ready for Kinsta.");
    Ok(())
}

// ── Composer detection ────────────────────────────────────────────────────────

/// Whether the project manages WordPress itself through composer, checked in
/// both the lockfile and the manifest.
fn has_wordpress_package(root: &Path) -> Result<bool> {
    if let Some(lock) = read_json(&root.join("composer.lock"))? {
        for section in ["packages", "packages-dev"] {
            if let Some(packages) = lock.get(section).and_then(|v| v.as_array()) {
                if packages
                    .iter()
                    .any(|p| p.get("name").and_then(|n| n.as_str()) == Some("roots/wordpress"))
                {
                    return Ok(true);
                }
            }
        }
    }
    if let Some(manifest) = read_json(&root.join("composer.json"))? {
        for section in ["require", "require-dev"] {
            if manifest
                .get(section)
                .and_then(|v| v.as_object())
                .is_some_and(|deps| deps.contains_key("roots/wordpress"))
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Whether `composer.json` already lists the in-house repository. Re-adding
/// through `composer config` would duplicate a list-style entry, so this is
/// checked manually first.
fn has_package_repository(root: &Path) -> Result<bool> {
    let Some(manifest) = read_json(&root.join("composer.json"))? else {
        return Ok(false);
    };
    let pattern = Regex::new(REPOSITORY_PATTERN).context("invalid repository pattern")?;

    let urls: Vec<&str> = match manifest.get("repositories") {
        Some(serde_json::Value::Array(list)) => list
            .iter()
            .filter_map(|repo| repo.get("url").and_then(|u| u.as_str()))
            .collect(),
        Some(serde_json::Value::Object(map)) => map
            .values()
            .filter_map(|repo| repo.get("url").and_then(|u| u.as_str()))
            .collect(),
        _ => Vec::new(),
    };
    Ok(urls.iter().any(|url| pattern.is_match(url)))
}

fn read_json(path: &Path) -> Result<Option<serde_json::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

// ── Config block ──────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum ConfigOutcome {
    Written,
    AlreadyPresent,
    NoConfigFile,
}

/// Insert the Kinsta constants after the salts (Bedrock/Nebula) or after the
/// table prefix (vanilla WordPress).
fn write_kinsta_config(project: &Project) -> Result<ConfigOutcome> {
    let bedrock_config = project.root().join("config").join("application.php");
    if bedrock_config.exists() {
        if config_has_kinsta_constants(&bedrock_config)? {
            return Ok(ConfigOutcome::AlreadyPresent);
        }
        project::insert_after_marker(&bedrock_config, "NONCE_SALT", BEDROCK_KINSTA_CONFIG)?;
        return Ok(ConfigOutcome::Written);
    }

    let vanilla_config = project.root().join("wp-config.php");
    if vanilla_config.exists() {
        if config_has_kinsta_constants(&vanilla_config)? {
            return Ok(ConfigOutcome::AlreadyPresent);
        }
        project::insert_after_marker(&vanilla_config, "$table_prefix", VANILLA_KINSTA_CONFIG)?;
        return Ok(ConfigOutcome::Written);
    }

    Ok(ConfigOutcome::NoConfigFile)
}

fn config_has_kinsta_constants(path: &Path) -> Result<bool> {
    for key in KINSTA_CONSTANTS {
        if project::file_contains(path, key)? {
            return Ok(true);
        }
    }
    Ok(false)
}

const BEDROCK_KINSTA_CONFIG: &str = "\n\
/**\n\
 * Kinsta\n\
 */\n\
$mu_plugins_url = Config::get( 'WP_CONTENT_URL' ) . '/mu-plugins';\n\
Config::define( 'KINSTA_CDN_USERDIRS', 'app' );\n\
Config::define( 'KINSTAMU_CUSTOM_MUPLUGIN_URL', \"{$mu_plugins_url}/kinsta-mu-plugins\" );\n\
Config::define( 'KINSTAMU_CAPABILITY', 'publish_pages' );\n\
Config::define( 'KINSTAMU_WHITELABEL', true );";

const VANILLA_KINSTA_CONFIG: &str = "\n\
/**\n\
 * Kinsta\n\
 */\n\
define( 'KINSTAMU_CAPABILITY', 'publish_pages' );\n\
define( 'KINSTAMU_WHITELABEL', true );";

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(root: &Path, name: &str, contents: &str) {
        std::fs::write(root.join(name), contents).expect("write fixture");
    }

    // -----------------------------------------------------------------------
    // Package detection
    // -----------------------------------------------------------------------

    #[test]
    fn test_wordpress_package_found_in_lockfile() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "composer.lock",
            r#"{"packages":[{"name":"roots/wordpress","version":"6.7.1"}]}"#,
        );
        assert!(has_wordpress_package(tmp.path()).expect("check"));
    }

    #[test]
    fn test_wordpress_package_found_in_manifest_require() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "composer.json",
            r#"{"require":{"roots/wordpress":"^6.7"}}"#,
        );
        assert!(has_wordpress_package(tmp.path()).expect("check"));
    }

    #[test]
    fn test_wordpress_package_absent_for_plain_project() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "composer.json", r#"{"require":{"monolog/monolog":"^3"}}"#);
        assert!(!has_wordpress_package(tmp.path()).expect("check"));
    }

    #[test]
    fn test_wordpress_package_absent_without_composer_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(!has_wordpress_package(tmp.path()).expect("check"));
    }

    // -----------------------------------------------------------------------
    // Repository detection
    // -----------------------------------------------------------------------

    #[test]
    fn test_repository_matched_in_list_form() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "composer.json",
            r#"{"repositories":[{"type":"composer","url":"https://code.eighteen73.co.uk/pkg/wordpress"}]}"#,
        );
        assert!(has_package_repository(tmp.path()).expect("check"));
    }

    #[test]
    fn test_repository_matched_in_map_form_with_legacy_host() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "composer.json",
            r#"{"repositories":{"orphans":{"type":"composer","url":"https://code.orphans.co.uk/pkg/wordpress"}}}"#,
        );
        assert!(has_package_repository(tmp.path()).expect("check"));
    }

    #[test]
    fn test_repository_url_must_match_exactly() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "composer.json",
            r#"{"repositories":[{"type":"composer","url":"https://code.eighteen73.co.uk/pkg/wordpress/extra"}]}"#,
        );
        assert!(!has_package_repository(tmp.path()).expect("check"));
    }

    #[test]
    fn test_repository_absent_when_section_missing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "composer.json", r"{}");
        assert!(!has_package_repository(tmp.path()).expect("check"));
    }

    // -----------------------------------------------------------------------
    // Config insertion
    // -----------------------------------------------------------------------

    #[test]
    fn test_config_inserted_after_salts_on_bedrock() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("config")).expect("mkdir");
        write(
            tmp.path(),
            "config/application.php",
            "<?php\nConfig::define( 'AUTH_SALT', env( 'AUTH_SALT' ) );\nConfig::define( 'NONCE_SALT', env( 'NONCE_SALT' ) );\nConfig::define( 'DISABLE_WP_CRON', true );\n",
        );

        let project = Project::at(tmp.path());
        assert_eq!(write_kinsta_config(&project).expect("write"), ConfigOutcome::Written);

        let updated = std::fs::read_to_string(tmp.path().join("config/application.php"))
            .expect("read back");
        let salt_pos = updated.find("NONCE_SALT").expect("salt line");
        let kinsta_pos = updated.find("KINSTA_CDN_USERDIRS").expect("kinsta line");
        let cron_pos = updated.find("DISABLE_WP_CRON").expect("cron line");
        assert!(salt_pos < kinsta_pos && kinsta_pos < cron_pos);
        assert!(updated.contains("Config::define( 'KINSTAMU_WHITELABEL', true );"));
    }

    #[test]
    fn test_config_left_untouched_when_constants_present() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("config")).expect("mkdir");
        let original = "<?php\nConfig::define( 'NONCE_SALT', env( 'NONCE_SALT' ) );\nConfig::define( 'KINSTAMU_CAPABILITY', 'publish_pages' );\n";
        write(tmp.path(), "config/application.php", original);

        let project = Project::at(tmp.path());
        assert_eq!(
            write_kinsta_config(&project).expect("write"),
            ConfigOutcome::AlreadyPresent
        );
        let after = std::fs::read_to_string(tmp.path().join("config/application.php"))
            .expect("read back");
        assert_eq!(after, original);
    }

    #[test]
    fn test_config_vanilla_uses_plain_defines_after_table_prefix() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "wp-config.php",
            "<?php\n$table_prefix = 'wp_';\nrequire_once ABSPATH . 'wp-settings.php';\n",
        );

        let project = Project::at(tmp.path());
        assert_eq!(write_kinsta_config(&project).expect("write"), ConfigOutcome::Written);

        let updated =
            std::fs::read_to_string(tmp.path().join("wp-config.php")).expect("read back");
        assert!(updated.contains("define( 'KINSTAMU_CAPABILITY', 'publish_pages' );"));
        assert!(!updated.contains("KINSTA_CDN_USERDIRS"));
        let prefix_pos = updated.find("$table_prefix").expect("prefix line");
        let kinsta_pos = updated.find("KINSTAMU_CAPABILITY").expect("kinsta line");
        assert!(prefix_pos < kinsta_pos);
    }

    #[test]
    fn test_config_missing_file_reports_no_config() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let project = Project::at(tmp.path());
        assert_eq!(
            write_kinsta_config(&project).expect("write"),
            ConfigOutcome::NoConfigFile
        );
    }
}
