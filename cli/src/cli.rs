//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;
use crate::version_gate::{self, GitTags};

/// Opinionated tooling for building and running Nebula WordPress sites
#[derive(Parser)]
#[command(
    name = "orbit",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format (version only)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer prompts with their defaults instead of asking
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new Nebula WordPress site
    CreateSite(commands::create_site::CreateSiteArgs),

    /// Pull the database, URLs and uploads from a remote environment
    Sync(commands::sync::SyncArgs),

    /// Bootstrap WordPress, then run the first sync
    FirstSync,

    /// Tidy up a site that has just gone live
    JustLaunched(commands::just_launched::JustLaunchedArgs),

    /// Install the style guide pages for sign-off
    StyleGuide(commands::style_guide::StyleGuideArgs),

    /// Prepare the site for Kinsta hosting
    KinstaPrep,

    /// Show version and check for updates
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the install is out of date.
    pub async fn run(self) -> Result<()> {
        let Cli { json, quiet, no_color, yes, command } = self;
        let app = AppContext::new(&AppFlags { no_color, quiet, yes });

        // Every mutating command refuses to run from a stale install.
        if !matches!(command, Command::Version) {
            let source = GitTags::new(app.runner);
            version_gate::enforce(&source, &app.output).await?;
        }

        match command {
            Command::CreateSite(args) => commands::create_site::run(&args, &app).await,
            Command::Sync(args) => commands::sync::run(&args, &app).await,
            Command::FirstSync => commands::first_sync::run(&app).await,
            Command::JustLaunched(args) => commands::just_launched::run(&args, &app).await,
            Command::StyleGuide(args) => commands::style_guide::run(&args, &app).await,
            Command::KinstaPrep => commands::kinsta_prep::run(&app).await,
            Command::Version => {
                let source = GitTags::new(app.runner);
                commands::version::run(&source, &app.output, json).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_site_parses_flags() {
        let cli = Cli::try_parse_from([
            "orbit",
            "create-site",
            "mysite",
            "--woocommerce",
            "--nebula-branch",
            "feature/blocks",
        ])
        .expect("parse");
        match cli.command {
            Command::CreateSite(args) => {
                assert_eq!(args.name, "mysite");
                assert!(args.woocommerce);
                assert!(!args.multisite);
                assert_eq!(args.nebula_branch.as_deref(), Some("feature/blocks"));
            }
            _ => panic!("expected create-site"),
        }
    }

    #[test]
    fn test_sync_defaults_to_no_explicit_parts() {
        let cli = Cli::try_parse_from(["orbit", "sync"]).expect("parse");
        match cli.command {
            Command::Sync(args) => {
                assert!(!args.database && !args.urls && !args.uploads);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_global_flags_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["orbit", "version", "--json", "--quiet"]).expect("parse");
        assert!(cli.json);
        assert!(cli.quiet);
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["orbit"]).is_err());
    }
}
