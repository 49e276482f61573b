//! `orbit create-site` — scaffold a complete Nebula WordPress site.
//!
//! Runs the full provisioning sequence: Nebula template, git repository,
//! WordPress core install, Pulsar theme, the house plugin set, and the
//! optional WooCommerce and multisite add-ons. Every stage ends with a
//! commit so the machine-applied changes stay auditable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::output::OutputContext;
use crate::project::Project;
use crate::runner::CommandRunner;
use crate::tools::composer::{self, Composer};
use crate::tools::git::Git;
use crate::tools::node;
use crate::tools::wp::{self, WpCli, WpCliProcess};
use crate::tools::{require_success, stdout_text};

const NEBULA_TEMPLATE: &str = "eighteen73/nebula";
const PULSAR_TEMPLATE: &str = "eighteen73/pulsar";

const HOUSE_PLUGINS: &[&str] = &[
    "wp-media/wp-rocket",
    "wpackagist-plugin/duracelltomi-google-tag-manager",
    "wpackagist-plugin/limit-login-attempts-reloaded",
    "wpackagist-plugin/mailgun",
    "wpackagist-plugin/redirection",
    "wpackagist-plugin/webp-express",
    "wpackagist-plugin/wordpress-seo",
];

const DEV_PLUGINS: &[&str] = &["wpackagist-plugin/spatie-ray"];

/// House defaults applied to every new site. Empty values switch the
/// feature off; WordPress stores booleans as `""`/`"1"`.
const HOUSE_OPTIONS: &[(&str, &str)] = &[
    ("blogdescription", ""),
    ("date_format", "d/m/Y"),
    ("timezone_string", "Europe/London"),
    ("default_ping_status", ""),
    ("default_pingback_flag", ""),
    ("comments_notify", ""),
    ("default_comment_status", ""),
    ("comment_moderation", "1"),
    ("comment_registration", "1"),
    ("moderation_notify", ""),
    ("page_comments", ""),
    ("comment_previously_approved", "1"),
    ("show_avatars", ""),
    ("permalink_structure", "/%postname%/"),
];

/// Quieten limit-login-attempts-reloaded before anyone logs in.
const LIMIT_LOGIN_OPTIONS: &[(&str, &str)] = &[
    ("limit_login_lockout_notify", ""),
    ("limit_login_show_warning_badge", "0"),
    ("limit_login_hide_dashboard_widget", "1"),
    ("limit_login_show_top_level_menu_item", "0"),
];

/// UK VAT: (rate, tax class, label).
const UK_VAT_RATES: &[(&str, &str, &str)] = &[
    ("20", "standard", "VAT"),
    ("5", "reduced-rate", "VAT (Reduced)"),
    ("0", "zero-rate", "VAT (Zero)"),
];

/// Arguments for the `orbit create-site` command.
#[derive(Args)]
pub struct CreateSiteArgs {
    /// Name for the new site, or an absolute path to install into
    pub name: String,

    /// Include WooCommerce with UK VAT rates
    #[arg(long)]
    pub woocommerce: bool,

    /// Convert the fresh install to a multisite network
    #[arg(long)]
    pub multisite: bool,

    /// Build from a specific Nebula branch instead of the default
    #[arg(long, value_name = "BRANCH")]
    pub nebula_branch: Option<String>,
}

/// Run `orbit create-site`.
///
/// # Errors
///
/// Returns an error when the destination is unusable, a tool invocation
/// fails, or the user declines the confirmation prompt.
pub async fn run(args: &CreateSiteArgs, app: &AppContext) -> Result<()> {
    let cwd = std::env::current_dir().context("could not determine the current directory")?;
    let (install_dir, site_name) = resolve_install_path(&args.name, &cwd);
    anyhow::ensure!(!site_name.is_empty(), "a site name is required");

    let ctx = &app.output;
    let confirmed = app.confirm(
        &format!(
            "Installing \"{site_name}\" to \"{}\". Is this OK?",
            install_dir.display()
        ),
        true,
    )?;
    anyhow::ensure!(confirmed, "installation cancelled");
    prepare_directory(&install_dir, ctx)?;

    let runner = &app.runner;
    let project = Project::at(&install_dir);
    let composer = Composer::new(&install_dir);
    let git = Git::new(&install_dir);

    ctx.header("Installing WordPress");
    composer::create_project(
        runner,
        NEBULA_TEMPLATE,
        &install_dir,
        args.nebula_branch.as_deref(),
    )
    .await?;
    composer.update(runner).await?;
    git.init(runner).await?;
    git.commit_all(runner, "Initial commit").await?;

    let home = project.home_url()?;
    let admin = prompt_admin_account(app)?;
    let wp = WpCliProcess::locate(app.runner, &project).await?;
    let password = install_wordpress(&wp, &site_name, &home, &admin).await?;
    git.commit_all(runner, "Install WordPress").await?;

    ctx.header("Installing theme");
    install_theme(runner, &wp, &project).await?;
    git.commit_all(runner, "Add Pulsar theme").await?;

    ctx.header("Installing default plugins");
    install_plugins(runner, &composer, &wp).await?;
    git.commit_all(runner, "Add house plugins").await?;

    if args.woocommerce {
        ctx.header("Installing WooCommerce");
        setup_woocommerce(runner, &composer, &wp, &admin.username).await?;
        git.commit_all(runner, "Add WooCommerce").await?;
    }

    if args.multisite {
        ctx.header("Converting to multisite");
        let subdomains = prompt_topology(app)?;
        convert_multisite(&wp, &project, &site_name, &home, subdomains).await?;
        git.commit_all(runner, "Enable multisite").await?;
    }

    ctx.success("Your website is ready.");
    ctx.kv("URL", &home);
    ctx.kv("Admin", &format!("{home}/wp/wp-admin"));
    ctx.kv("Username", &admin.username);
    ctx.kv("Password", &password);
    Ok(())
}

// ── Destination handling ──────────────────────────────────────────────────────

/// An absolute `name` is used as-is (site name = basename); a bare name
/// installs under `cwd`.
fn resolve_install_path(name: &str, cwd: &Path) -> (PathBuf, String) {
    let trimmed = name.trim_end_matches('/');
    if trimmed.starts_with('/') {
        let dir = PathBuf::from(trimmed);
        let site_name = dir
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        (dir, site_name)
    } else {
        (cwd.join(trimmed), trimmed.to_string())
    }
}

fn prepare_directory(dir: &Path, ctx: &OutputContext) -> Result<()> {
    if !dir.is_dir() {
        ctx.info(&format!("Creating directory {}", dir.display()));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("could not create directory {}", dir.display()))?;
    }
    let metadata = std::fs::metadata(dir)
        .with_context(|| format!("could not inspect {}", dir.display()))?;
    anyhow::ensure!(
        !metadata.permissions().readonly(),
        "{} is not writable by the current user",
        dir.display()
    );
    Ok(())
}

// ── WordPress install ─────────────────────────────────────────────────────────

struct AdminAccount {
    username: String,
    email: String,
}

fn prompt_admin_account(app: &AppContext) -> Result<AdminAccount> {
    let username = app.input("Admin username", "")?.trim().to_lowercase();
    anyhow::ensure!(!username.is_empty(), "an admin username is required");
    let email = app.input("Admin email address", "")?.trim().to_lowercase();
    anyhow::ensure!(email.contains('@'), "a valid admin email address is required");
    Ok(AdminAccount { username, email })
}

/// Install core against the `.env` home URL and apply the house options.
///
/// Returns the password WordPress generated for the admin account, or an
/// empty string when it could not be found in the command output.
async fn install_wordpress(
    wp: &impl WpCli,
    site_name: &str,
    home: &str,
    admin: &AdminAccount,
) -> Result<String> {
    let url = format!("--url={home}/web");
    let title = format!("--title={site_name}");
    let user = format!("--admin_user={}", admin.username);
    let email = format!("--admin_email={}", admin.email);
    let output = wp
        .run(&["core", "install", "--skip-email", &url, &title, &user, &email])
        .await?;
    let output = require_success("wp core install", output)?;
    let password = capture_password(&stdout_text(&output)).unwrap_or_default();

    let output = wp.run(&["language", "core", "install", "en_GB"]).await?;
    require_success("wp language core install", output)?;
    let output = wp.run(&["site", "switch-language", "en_GB"]).await?;
    require_success("wp site switch-language", output)?;

    for &(name, value) in HOUSE_OPTIONS {
        wp::option_update(wp, name, value).await?;
    }

    Ok(password)
}

/// The password only appears in the install output when WordPress
/// generated one itself.
fn capture_password(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Admin password: "))
        .map(|password| password.trim().to_string())
}

// ── Theme and plugins ─────────────────────────────────────────────────────────

async fn install_theme(
    runner: &impl CommandRunner,
    wp: &impl WpCli,
    project: &Project,
) -> Result<()> {
    let theme_dir = project.themes_dir().join("pulsar");
    composer::create_project(runner, PULSAR_TEMPLATE, &theme_dir, None).await?;
    node::npm_install(runner, &theme_dir).await?;
    project.ensure_gitignored("web/app/themes/pulsar/node_modules")?;
    let output = wp.run(&["theme", "activate", "pulsar"]).await?;
    require_success("wp theme activate pulsar", output)?;
    Ok(())
}

fn plugin_slug(package: &str) -> &str {
    package.rsplit('/').next().unwrap_or(package)
}

async fn install_plugins(
    runner: &impl CommandRunner,
    composer: &Composer,
    wp: &impl WpCli,
) -> Result<()> {
    composer.require(runner, HOUSE_PLUGINS).await?;
    composer.require_dev(runner, DEV_PLUGINS).await?;

    let mut activate = vec!["plugin", "activate"];
    activate.extend(HOUSE_PLUGINS.iter().chain(DEV_PLUGINS).map(|p| plugin_slug(p)));
    let output = wp.run(&activate).await?;
    require_success("wp plugin activate", output)?;

    for &(name, value) in LIMIT_LOGIN_OPTIONS {
        let output = wp
            .run(&["option", "add", name, value, "--autoload=yes"])
            .await?;
        require_success(&format!("wp option add {name}"), output)?;
    }
    // The welcome transient only exists once the plugin has served a page.
    let _ = wp
        .run(&["transient", "delete", "llar_welcome_redirect"])
        .await?;

    let mailgun = mailgun_settings().to_string();
    let output = wp
        .run_with_stdin(
            &["option", "add", "mailgun", "--format=json", "--autoload=yes"],
            mailgun.as_bytes(),
        )
        .await?;
    require_success("wp option add mailgun", output)?;
    Ok(())
}

/// EU-region API defaults for the mailgun plugin; credentials are left for
/// the developer to fill in.
fn mailgun_settings() -> serde_json::Value {
    serde_json::json!({
        "region": "eu",
        "useAPI": "1",
        "domain": "site-email.com",
        "apiKey": "",
        "username": "",
        "password": "",
        "secure": "1",
        "sectype": "ssl",
        "track-clicks": "no",
        "track-opens": "1",
        "from-address": "",
        "from-name": "",
        "override-from": "0",
        "campaign-id": "",
    })
}

// ── WooCommerce ───────────────────────────────────────────────────────────────

async fn setup_woocommerce(
    runner: &impl CommandRunner,
    composer: &Composer,
    wp: &impl WpCli,
    admin_username: &str,
) -> Result<()> {
    composer
        .require(runner, &["wpackagist-plugin/woocommerce"])
        .await?;
    let output = wp.run(&["plugin", "activate", "woocommerce"]).await?;
    require_success("wp plugin activate woocommerce", output)?;

    // wc commands require an authenticated user.
    let user = format!("--user={admin_username}");
    for &(rate, class, name) in UK_VAT_RATES {
        let rate_arg = format!("--rate={rate}");
        let class_arg = format!("--class={class}");
        let name_arg = format!("--name={name}");
        let output = wp
            .run(&[
                "wc",
                "tax",
                "create",
                "--country=GB",
                &rate_arg,
                &class_arg,
                &name_arg,
                &user,
            ])
            .await?;
        require_success("wp wc tax create", output)?;
    }
    Ok(())
}

// ── Multisite ─────────────────────────────────────────────────────────────────

fn prompt_topology(app: &AppContext) -> Result<bool> {
    let choice = app.select("Multisite topology", &["Sub-directories", "Sub-domains"], 0)?;
    Ok(choice == 1)
}

async fn convert_multisite(
    wp: &impl WpCli,
    project: &Project,
    site_name: &str,
    home: &str,
    subdomains: bool,
) -> Result<()> {
    let title = format!("--title={site_name}");
    let mut args = vec!["core", "multisite-convert", title.as_str()];
    if subdomains {
        args.push("--subdomains");
    }
    let output = wp.run(&args).await?;
    require_success("wp core multisite-convert", output)?;

    let domain =
        host_from_url(home).with_context(|| format!("WP_HOME has no hostname: {home}"))?;
    project.add_config_include("multisite.php", &multisite_config_body(domain, subdomains))?;
    project.set_env_value("WP_ALLOW_MULTISITE", "true")?;
    project.replace_htaccess_rules(multisite_rewrite_rules(subdomains))?;
    Ok(())
}

fn host_from_url(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', ':', '?', '#']).next()?;
    (!host.is_empty()).then_some(host)
}

fn multisite_config_body(domain: &str, subdomains: bool) -> String {
    let subdomain_install = if subdomains { "true" } else { "false" };
    format!(
        "Config::define('MULTISITE', true);\n\
         Config::define('SUBDOMAIN_INSTALL', {subdomain_install});\n\
         Config::define('DOMAIN_CURRENT_SITE', '{domain}');\n\
         Config::define('PATH_CURRENT_SITE', '/');\n\
         Config::define('SITE_ID_CURRENT_SITE', 1);\n\
         Config::define('BLOG_ID_CURRENT_SITE', 1);\n"
    )
}

/// Network rewrite rules for a Bedrock layout, where core lives in `wp/`.
fn multisite_rewrite_rules(subdomains: bool) -> &'static str {
    if subdomains {
        "RewriteEngine On\n\
         RewriteRule .* - [E=HTTP_AUTHORIZATION:%{HTTP:Authorization}]\n\
         RewriteBase /\n\
         RewriteRule ^index\\.php$ - [L]\n\
         RewriteCond %{REQUEST_FILENAME} -f [OR]\n\
         RewriteCond %{REQUEST_FILENAME} -d\n\
         RewriteRule ^ - [L]\n\
         RewriteRule ^(wp-(content|admin|includes).*) wp/$1 [L]\n\
         RewriteRule ^(.*\\.php)$ wp/$1 [L]\n\
         RewriteRule . index.php [L]"
    } else {
        "RewriteEngine On\n\
         RewriteRule .* - [E=HTTP_AUTHORIZATION:%{HTTP:Authorization}]\n\
         RewriteBase /\n\
         RewriteRule ^index\\.php$ - [L]\n\
         # add a trailing slash to /wp-admin\n\
         RewriteRule ^([_0-9a-zA-Z-]+/)?wp-admin$ $1wp-admin/ [R=301,L]\n\
         RewriteCond %{REQUEST_FILENAME} -f [OR]\n\
         RewriteCond %{REQUEST_FILENAME} -d\n\
         RewriteRule ^ - [L]\n\
         RewriteRule ^([_0-9a-zA-Z-]+/)?(wp-(content|admin|includes).*) wp/$2 [L]\n\
         RewriteRule ^([_0-9a-zA-Z-]+/)?(.*\\.php)$ wp/$2 [L]\n\
         RewriteRule . index.php [L]"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
