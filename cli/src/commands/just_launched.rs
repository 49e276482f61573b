//! `orbit just-launched` — normalize a site right after it goes live.
//!
//! Launch day leaves stale pre-launch URLs, transients, and search indexes
//! behind. This replaces every old domain with the live one and resets the
//! cached state, validating all domains before anything is touched.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::error::DomainError;
use crate::output::OutputContext;
use crate::project::Project;
use crate::settings::parse_csv_list;
use crate::tools::require_success;
use crate::tools::wp::{self, PluginStatus, WpCli, WpCliProcess};

/// Arguments for the `orbit just-launched` command.
#[derive(Args)]
pub struct JustLaunchedArgs {
    /// Domain(s) the site used before launch, comma-separated
    #[arg(long, value_name = "DOMAINS")]
    pub old_domain: Option<String>,

    /// Domain the site lives on now
    #[arg(long, value_name = "DOMAIN")]
    pub new_domain: Option<String>,
}

/// Run `orbit just-launched`.
///
/// # Errors
///
/// Returns an error when a domain fails validation or any reset fails.
pub async fn run(args: &JustLaunchedArgs, app: &AppContext) -> Result<()> {
    let change = parse_domain_args(args.old_domain.as_deref(), args.new_domain.as_deref())?;

    let project = Project::current()?;
    let wp = WpCliProcess::locate(app.runner, &project).await?;
    let ctx = &app.output;

    match &change {
        Some(change) => replace_domains(&wp, change, ctx).await?,
        None => ctx.info("No domains to replace; running resets only."),
    }
    reset_state(&wp, ctx).await?;

    ctx.success("Post-launch cleanup complete.");
    Ok(())
}

/// A validated domain replacement set.
#[derive(Debug, PartialEq, Eq)]
struct DomainChange {
    old: Vec<String>,
    new: String,
}

/// Parse and validate the domain flags before any mutation happens.
fn parse_domain_args(old: Option<&str>, new: Option<&str>) -> Result<Option<DomainChange>> {
    let old_domains = old.map(parse_csv_list).unwrap_or_default();
    if old_domains.is_empty() {
        return Ok(None);
    }
    let Some(new) = new else {
        return Err(DomainError::MissingNewDomain.into());
    };
    for domain in &old_domains {
        validate_bare_hostname(domain)?;
    }
    validate_bare_hostname(new)?;
    Ok(Some(DomainChange {
        old: old_domains,
        new: new.to_string(),
    }))
}

/// A bare hostname: dot-separated alphanumeric/hyphen labels. No scheme,
/// path, port, or spaces; anything fancier belongs in a manual
/// `wp search-replace`.
fn validate_bare_hostname(domain: &str) -> Result<(), DomainError> {
    let valid = domain.contains('.')
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        });
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidHostname(domain.to_string()))
    }
}

/// Protocol-relative replacement catches http and https references alike.
async fn replace_domains(
    wp: &impl WpCli,
    change: &DomainChange,
    ctx: &OutputContext,
) -> Result<()> {
    for old in &change.old {
        let from = format!("//{old}");
        let to = format!("//{}", change.new);
        let output = wp.run(&["search-replace", &from, &to]).await?;
        require_success(&format!("wp search-replace {from} {to}"), output)?;
        ctx.info(&format!("Replaced {from} with {to}"));
    }
    Ok(())
}

/// Drop cached state that still reflects the pre-launch site.
async fn reset_state(wp: &impl WpCli, ctx: &OutputContext) -> Result<()> {
    for args in [
        ["transient", "delete", "--all"].as_slice(),
        ["cache", "flush"].as_slice(),
    ] {
        let output = wp.run(args).await?;
        require_success(&format!("wp {}", args.join(" ")), output)?;
    }

    if wp::plugin_status(wp, "wordpress-seo").await? != PluginStatus::NotInstalled {
        let output = wp.run(&["yoast", "index", "--reindex"]).await?;
        require_success("wp yoast index --reindex", output)?;
        ctx.info("Yoast index rebuilt");
    }

    ctx.info("Caches and transients cleared");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::wp::testing::StubWp;

    // -----------------------------------------------------------------------
    // Argument parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_no_flags_is_resets_only() {
        assert_eq!(parse_domain_args(None, None).expect("parse"), None);
    }

    #[test]
    fn test_parse_old_without_new_is_an_error() {
        let err = parse_domain_args(Some("old.example.com"), None).expect_err("should fail");
        assert!(err.to_string().contains("--new-domain"), "got: {err}");
    }

    #[test]
    fn test_parse_dedupes_and_trims_old_domains() {
        let change = parse_domain_args(
            Some(" a.example.com , b.example.com , a.example.com "),
            Some("example.com"),
        )
        .expect("parse")
        .expect("some change");
        assert_eq!(change.old, vec!["a.example.com", "b.example.com"]);
        assert_eq!(change.new, "example.com");
    }

    #[test]
    fn test_parse_rejects_invalid_old_domain_naming_it() {
        let err = parse_domain_args(Some("https://old.example.com"), Some("example.com"))
            .expect_err("should fail");
        assert!(err.to_string().contains("https://old.example.com"), "got: {err}");
    }

    #[test]
    fn test_parse_rejects_invalid_new_domain() {
        assert!(parse_domain_args(Some("old.example.com"), Some("new example.com")).is_err());
    }

    // -----------------------------------------------------------------------
    // Hostname validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_hostname_accepts_plain_domains() {
        for domain in ["example.com", "staging.example.co.uk", "x-1.example.org"] {
            assert!(validate_bare_hostname(domain).is_ok(), "{domain}");
        }
    }

    #[test]
    fn test_hostname_rejects_schemes_paths_ports_and_spaces() {
        for domain in [
            "https://example.com",
            "example.com/path",
            "example.com:8080",
            "exa mple.com",
            "example",
            "-bad.example.com",
            "bad-.example.com",
            ".example.com",
            "example.com.",
        ] {
            assert!(validate_bare_hostname(domain).is_err(), "{domain}");
        }
    }

    // -----------------------------------------------------------------------
    // Replacement and resets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_replace_domains_is_protocol_relative_per_old_domain() {
        let wp = StubWp::new()
            .respond(&["search-replace", "//a.example.com", "//example.com"], 0, "")
            .respond(&["search-replace", "//b.example.com", "//example.com"], 0, "");
        let change = DomainChange {
            old: vec!["a.example.com".to_string(), "b.example.com".to_string()],
            new: "example.com".to_string(),
        };
        let ctx = OutputContext::new(true, true);
        replace_domains(&wp, &change, &ctx).await.expect("replace");
        assert_eq!(wp.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_state_skips_yoast_when_not_installed() {
        let wp = StubWp::new()
            .respond(&["transient", "delete", "--all"], 0, "")
            .respond(&["cache", "flush"], 0, "")
            .respond(&["plugin", "is-active", "wordpress-seo"], 1, "")
            .respond(&["plugin", "is-installed", "wordpress-seo"], 1, "");
        let ctx = OutputContext::new(true, true);
        reset_state(&wp, &ctx).await.expect("reset");
        assert!(!wp
            .recorded()
            .iter()
            .any(|call| call.first().map(String::as_str) == Some("yoast")));
    }

    #[tokio::test]
    async fn test_reset_state_reindexes_yoast_when_installed() {
        let wp = StubWp::new()
            .respond(&["transient", "delete", "--all"], 0, "")
            .respond(&["cache", "flush"], 0, "")
            .respond(&["plugin", "is-active", "wordpress-seo"], 0, "")
            .respond(&["yoast", "index", "--reindex"], 0, "");
        let ctx = OutputContext::new(true, true);
        reset_state(&wp, &ctx).await.expect("reset");
        assert!(wp
            .recorded()
            .iter()
            .any(|call| call.first().map(String::as_str) == Some("yoast")));
    }
}
