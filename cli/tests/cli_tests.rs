//! Integration tests for the orbit CLI surface
//!
//! These tests run the real binary and verify argument parsing, help output,
//! and the guard rails that must trip before any tool is spawned.

#![allow(clippy::expect_used, deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

fn orbit() -> Command {
    let mut cmd = Command::cargo_bin("orbit").expect("orbit binary should exist");
    // Keep the binary off the network during tests.
    cmd.env("ORBIT_SKIP_VERSION_CHECK", "1");
    cmd.env_remove("WP_ENV");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    orbit()
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Opinionated tooling for building and running Nebula WordPress sites",
        ));
}

#[test]
fn test_cli_help_flag_shows_help() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    orbit()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("orbit 1.3.0"));
}

#[test]
fn test_version_command_shows_version() {
    orbit()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("orbit 1.3.0"));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    orbit()
        .args(["version", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"version":"1.3.0"}"#));
}

// --- Command hierarchy tests ---

#[test]
fn test_help_shows_create_site_command() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create-site"));
}

#[test]
fn test_help_shows_sync_command() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn test_help_shows_first_sync_command() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("first-sync"));
}

#[test]
fn test_help_shows_just_launched_command() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("just-launched"));
}

#[test]
fn test_help_shows_style_guide_command() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("style-guide"));
}

#[test]
fn test_help_shows_kinsta_prep_command() {
    orbit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("kinsta-prep"));
}

#[test]
fn test_sync_help_lists_step_flags() {
    orbit()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--database"))
        .stdout(predicate::str::contains("--urls"))
        .stdout(predicate::str::contains("--uploads"));
}

#[test]
fn test_create_site_help_lists_options() {
    orbit()
        .args(["create-site", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--woocommerce"))
        .stdout(predicate::str::contains("--multisite"))
        .stdout(predicate::str::contains("--nebula-branch"));
}

// --- Global flags tests ---

#[test]
fn test_global_json_flag_accepted() {
    orbit()
        .args(["--json", "version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"version":"#));
}

#[test]
fn test_global_quiet_flag_accepted() {
    orbit()
        .args(["--quiet", "version", "--json"])
        .assert()
        .success();
}

#[test]
fn test_global_no_color_flag_accepted() {
    orbit()
        .args(["--no-color", "version", "--json"])
        .assert()
        .success();
}

#[test]
fn test_no_color_env_var_accepted() {
    orbit()
        .env("NO_COLOR", "true")
        .args(["version", "--json"])
        .assert()
        .success();
}

// --- Error handling tests ---

#[test]
fn test_unknown_command_exits_with_error() {
    orbit()
        .arg("nonexistent")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_create_site_requires_a_name() {
    orbit()
        .arg("create-site")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NAME"));
}

// --- Guard rail tests ---

#[test]
fn test_sync_refuses_production_environment() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    orbit()
        .current_dir(dir.path())
        .env("WP_ENV", "production")
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Sync is not allowed when the environment is \"production\"",
        ));
}

#[test]
fn test_first_sync_refuses_production_environment() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    orbit()
        .current_dir(dir.path())
        .env("WP_ENV", "production")
        .arg("first-sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Sync is not allowed when the environment is \"production\"",
        ));
}

#[test]
fn test_just_launched_rejects_invalid_old_domain() {
    orbit()
        .args([
            "just-launched",
            "--old-domain",
            "not a domain",
            "--new-domain",
            "example.com",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a valid domain"));
}

#[test]
fn test_just_launched_rejects_old_domain_without_new() {
    orbit()
        .args(["just-launched", "--old-domain", "staging.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--new-domain is required when --old-domain is given",
        ));
}

#[test]
fn test_just_launched_rejects_url_as_domain() {
    orbit()
        .args([
            "just-launched",
            "--old-domain",
            "https://staging.example.com",
            "--new-domain",
            "example.com",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wp search-replace"));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use proptest::prelude::*;

    fn orbit() -> Command {
        let mut cmd = Command::cargo_bin("orbit").expect("orbit binary should exist");
        cmd.env("ORBIT_SKIP_VERSION_CHECK", "1");
        cmd.env_remove("WP_ENV");
        cmd
    }

    proptest! {
        // The binary spawns per case; keep the case count low.
        #![proptest_config(ProptestConfig::with_cases(8))]

        /// Any unknown command should fail with a parse error
        #[test]
        fn prop_unknown_command_fails(cmd in "[a-z]{3,10}") {
            let known = [
                "create-site", "sync", "first-sync", "just-launched",
                "style-guide", "kinsta-prep", "version", "help",
            ];
            if known.contains(&cmd.as_str()) {
                return Ok(());
            }

            orbit()
                .arg(&cmd)
                .assert()
                .code(2);
        }

        /// Version command with --json always produces valid JSON structure
        #[test]
        fn prop_version_json_valid_structure(_seed in 0u32..1000) {
            let output = orbit()
                .args(["version", "--json"])
                .output()
                .expect("command should run");

            let stdout = String::from_utf8_lossy(&output.stdout);
            prop_assert!(stdout.contains(r#""version":"#), "should contain version key");
            prop_assert!(stdout.trim().ends_with('}'), "should end with brace");
        }

        /// Global flags can be placed before any command
        #[test]
        fn prop_global_flags_before_version(
            quiet in proptest::bool::ANY,
            no_color in proptest::bool::ANY,
            yes in proptest::bool::ANY,
        ) {
            let mut cmd = orbit();
            if quiet { cmd.arg("--quiet"); }
            if no_color { cmd.arg("--no-color"); }
            if yes { cmd.arg("--yes"); }
            cmd.args(["version", "--json"]);

            cmd.assert().success();
        }

        /// Dotless names are never accepted as replacement domains
        #[test]
        fn prop_just_launched_rejects_dotless_domains(name in "[a-z]{1,12}") {
            orbit()
                .args(["just-launched", "--old-domain", &name, "--new-domain", "example.com"])
                .assert()
                .failure()
                .stderr(predicate::str::contains("is not a valid domain"));
        }
    }
}
