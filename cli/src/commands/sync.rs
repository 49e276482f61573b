//! `orbit sync` — replicate a remote environment into this one.

use std::process::Stdio;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::app::AppContext;
use crate::output::{OutputContext, progress};
use crate::project::Project;
use crate::runner::CommandRunner;
use crate::settings::{self, SyncSettings};
use crate::tools::remote::SshConnection;
use crate::tools::wp::{self, PluginStatus, WpCli, WpCliProcess};
use crate::tools::{require_success, stdout_text};

/// Arguments for the `orbit sync` command.
#[derive(Args)]
pub struct SyncArgs {
    /// Fetch the remote database
    #[arg(long)]
    pub database: bool,

    /// Rewrite remote URLs to local ones
    #[arg(long)]
    pub urls: bool,

    /// Mirror the remote uploads directory
    #[arg(long)]
    pub uploads: bool,
}

/// Which sync steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPlan {
    pub database: bool,
    pub urls: bool,
    pub uploads: bool,
}

impl SyncPlan {
    /// No flags means everything runs.
    #[must_use]
    pub fn from_flags(database: bool, urls: bool, uploads: bool) -> Self {
        if database || urls || uploads {
            Self {
                database,
                urls,
                uploads,
            }
        } else {
            Self::everything()
        }
    }

    #[must_use]
    pub fn everything() -> Self {
        Self {
            database: true,
            urls: true,
            uploads: true,
        }
    }

    /// Caches are cleared whenever at least one step ran.
    #[must_use]
    pub fn clears_caches(&self) -> bool {
        self.database || self.urls || self.uploads
    }
}

/// Run `orbit sync`.
///
/// # Errors
///
/// Returns an error when a precondition fails or any tool exits non-zero.
pub async fn run(args: &SyncArgs, app: &AppContext) -> Result<()> {
    let plan = SyncPlan::from_flags(args.database, args.urls, args.uploads);
    let project = Project::current()?;
    sync_project(&project, plan, app).await
}

/// The full sync flow, shared with `orbit first-sync`.
pub(crate) async fn sync_project(project: &Project, plan: SyncPlan, app: &AppContext) -> Result<()> {
    let ctx = &app.output;
    let runner = &app.runner;

    // Environment guard. The cheap layers catch a production checkout before
    // anything else runs; when they are silent the check repeats through
    // `wp config` once WP-CLI is located.
    let early_tag = settings::environment_tag_early(project)?;
    if early_tag.is_some() {
        settings::ensure_syncable_environment(early_tag.as_deref())?;
    }

    let wp = WpCliProcess::locate(*runner, project).await?;

    if early_tag.is_none() {
        let tag = settings::environment_tag(project, &wp).await?;
        settings::ensure_syncable_environment(tag.as_deref())?;
    }

    let sync = SyncSettings::resolve(project, &wp).await?;
    let conn = sync.connection();

    ctx.info(&format!("Syncing from {}", conn.target()));
    conn.check_reachable(runner).await?;
    let remote_binary = conn.locate_remote_wp(runner, &sync.remote_path).await?;
    let remote = RemoteWp {
        conn: &conn,
        path: &sync.remote_path,
        binary: &remote_binary,
    };

    if plan.database {
        fetch_database(&wp, &remote, runner, ctx).await?;
        reconcile_plugins(&wp, &sync, ctx).await?;
        sandbox_payment_gateways(&wp, ctx).await?;
    }
    if plan.urls {
        replace_urls(project, &wp, &remote, runner, ctx).await?;
    }
    if plan.uploads {
        fetch_uploads(project, &conn, &sync, runner, ctx).await?;
    }
    if plan.clears_caches() {
        clear_caches(&wp, ctx).await?;
    }

    ctx.success("Sync complete.");
    Ok(())
}

/// The remote WP-CLI invocation target: every command runs from the project
/// root with the probed binary.
struct RemoteWp<'a> {
    conn: &'a SshConnection,
    path: &'a str,
    binary: &'a str,
}

impl RemoteWp<'_> {
    fn command(&self, wp_args: &str) -> String {
        format!("cd {} && {} {wp_args}", self.path, self.binary)
    }

    async fn exec(&self, runner: &impl CommandRunner, wp_args: &str) -> Result<std::process::Output> {
        self.conn.exec(runner, &self.command(wp_args)).await
    }
}

/// Stream the remote database straight into the local one. Nothing is staged
/// to disk: `ssh … "wp db export - | gzip"` feeds a local `gunzip` whose
/// output becomes `wp db import -`'s stdin. The ssh-to-gunzip copy runs
/// through this process so the transfer can be byte-counted.
async fn fetch_database(
    wp: &impl WpCli,
    remote: &RemoteWp<'_>,
    runner: &impl CommandRunner,
    ctx: &OutputContext,
) -> Result<()> {
    // GTID-enabled MySQL needs --set-gtid-purged=OFF on export; MariaDB's
    // dump tool rejects the flag, so probe before adding it.
    let probe = remote
        .exec(runner, "db query \"SHOW VARIABLES LIKE 'gtid_mode'\"")
        .await?;
    let gtid_flag = if stdout_text(&probe).is_empty() {
        ""
    } else {
        " --set-gtid-purged=OFF"
    };

    let mut export = remote
        .conn
        .spawn(runner, &remote.command(&format!("db export{gtid_flag} - | gzip")))?;
    let mut export_stdout = export.stdout.take().context("remote export stdout missing")?;

    let mut gunzip = runner.spawn("gunzip", &[], Stdio::piped())?;
    let mut gunzip_stdin = gunzip.stdin.take().context("gunzip stdin missing")?;
    let gunzip_stdout = gunzip.stdout.take().context("gunzip stdout missing")?;

    let import_stdin: Stdio = gunzip_stdout
        .try_into()
        .context("gunzip stdout as import stdin")?;
    let mut import = wp.spawn(&["db", "import", "-"], import_stdin)?;

    let bar = ctx
        .show_progress()
        .then(|| progress::byte_counter("Downloading database"));

    let mut buf = vec![0u8; 64 * 1024];
    let mut transferred: u64 = 0;
    loop {
        let n = export_stdout
            .read(&mut buf)
            .await
            .context("reading remote export stream")?;
        if n == 0 {
            break;
        }
        gunzip_stdin
            .write_all(&buf[..n])
            .await
            .context("feeding gunzip")?;
        transferred += n as u64;
        if let Some(bar) = &bar {
            bar.set_position(transferred);
        }
    }
    // EOF for gunzip, which in turn ends the import's stdin.
    drop(gunzip_stdin);

    let export_status = export.wait().await.context("waiting for remote export")?;
    let gunzip_status = gunzip.wait().await.context("waiting for gunzip")?;
    let import_output = import.wait_with_output().await.context("waiting for wp db import")?;

    if let Some(bar) = &bar {
        if export_status.success() && gunzip_status.success() && import_output.status.success() {
            progress::finish_ok(bar, "Database imported");
        } else {
            progress::finish_error(bar, "Database import failed");
        }
    }

    anyhow::ensure!(
        export_status.success(),
        "remote database export failed ({export_status})"
    );
    anyhow::ensure!(gunzip_status.success(), "gunzip failed ({gunzip_status})");
    anyhow::ensure!(
        import_output.status.success(),
        "wp db import failed ({})",
        import_output.status
    );

    if !ctx.show_progress() {
        ctx.success("Database imported");
    }
    Ok(())
}

/// What plugin reconciliation decided for one slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PluginAction {
    Apply,
    AlreadyDone,
    NotInstalled,
}

fn reconcile_action(status: PluginStatus, want_active: bool) -> PluginAction {
    match (status, want_active) {
        (PluginStatus::NotInstalled, _) => PluginAction::NotInstalled,
        (PluginStatus::Active, true) | (PluginStatus::Inactive, false) => PluginAction::AlreadyDone,
        (PluginStatus::Active, false) | (PluginStatus::Inactive, true) => PluginAction::Apply,
    }
}

/// Bring plugin activation in line with the configured lists. Local-only
/// tooling plugins come back on, production-only ones go off.
async fn reconcile_plugins(
    wp: &impl WpCli,
    sync: &SyncSettings,
    ctx: &OutputContext,
) -> Result<()> {
    let wanted = sync
        .activate_plugins
        .iter()
        .map(|slug| (slug, true))
        .chain(sync.deactivate_plugins.iter().map(|slug| (slug, false)));

    for (slug, want_active) in wanted {
        let verb = if want_active { "activate" } else { "deactivate" };
        let status = wp::plugin_status(wp, slug).await?;
        match reconcile_action(status, want_active) {
            PluginAction::NotInstalled => {
                ctx.warn(&format!("Cannot {verb} {slug}: plugin is not installed"));
            }
            PluginAction::AlreadyDone => {
                ctx.warn(&format!("Skipping {slug}: already {}", if want_active { "active" } else { "inactive" }));
            }
            PluginAction::Apply => {
                let output = wp.run(&["plugin", verb, slug]).await?;
                require_success(&format!("wp plugin {verb} {slug}"), output)?;
                ctx.info(&format!("{} {slug}", if want_active { "Activated" } else { "Deactivated" }));
            }
        }
    }
    Ok(())
}

/// Force Stripe into test mode after pulling a production database, so a
/// local checkout can never charge real cards.
async fn sandbox_payment_gateways(wp: &impl WpCli, ctx: &OutputContext) -> Result<()> {
    if wp::plugin_status(wp, "woocommerce").await? != PluginStatus::Active {
        return Ok(());
    }
    let output = wp
        .run(&["option", "get", "woocommerce_stripe_settings", "--format=json"])
        .await?;
    if !output.status.success() {
        return Ok(());
    }
    let mut value: serde_json::Value = serde_json::from_str(&stdout_text(&output))
        .context("woocommerce_stripe_settings is not valid JSON")?;
    let Some(settings) = value.as_object_mut() else {
        return Ok(());
    };
    settings.insert(
        "testmode".to_string(),
        serde_json::Value::String("yes".to_string()),
    );
    wp::option_update_json(wp, "woocommerce_stripe_settings", &value.to_string()).await?;
    ctx.info("Stripe switched to test mode");
    Ok(())
}

/// Rewrite the remote base URL to the local one everywhere except the GUID
/// column, which must keep its original value.
async fn replace_urls(
    project: &Project,
    wp: &impl WpCli,
    remote: &RemoteWp<'_>,
    runner: &impl CommandRunner,
    ctx: &OutputContext,
) -> Result<()> {
    let output = remote.exec(runner, "option get home").await?;
    let remote_home = stdout_text(&output);
    let local_home = project.home_url()?;

    if remote_home == local_home {
        ctx.info("URLs already match; skipping search-replace");
        return Ok(());
    }

    let output = wp
        .run(&[
            "search-replace",
            &remote_home,
            &local_home,
            "--skip-columns=guid",
            "--all-tables",
        ])
        .await?;
    require_success("wp search-replace", output)?;

    let output = wp.run(&["rewrite", "flush"]).await?;
    require_success("wp rewrite flush", output)?;

    ctx.success(&format!("URLs rewritten to {local_home}"));
    Ok(())
}

/// Mirror the remote uploads directory. rsync renders its own progress when
/// attached to a terminal.
async fn fetch_uploads(
    project: &Project,
    conn: &SshConnection,
    sync: &SyncSettings,
    runner: &impl CommandRunner,
    ctx: &OutputContext,
) -> Result<()> {
    let dest = project.uploads_dir();
    std::fs::create_dir_all(&dest).with_context(|| format!("create {}", dest.display()))?;

    let source = conn.rsync_target(&format!("{}/web/app/uploads/", sync.remote_path));
    let args = rsync_args(&source, &dest.display().to_string(), conn.port, ctx.is_tty);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let status = runner.run_status("rsync", &args).await?;
    anyhow::ensure!(status.success(), "rsync failed ({status})");
    ctx.success("Uploads mirrored");
    Ok(())
}

/// rsync argument set for mirroring uploads: archive, compress, delete
/// local-only files, ssh on the configured port.
fn rsync_args(source: &str, dest: &str, port: u16, tty: bool) -> Vec<String> {
    let mut args = vec![
        "-az".to_string(),
        "--delete".to_string(),
        "-e".to_string(),
        format!("ssh -p {port}"),
    ];
    if tty {
        args.push("--info=progress2".to_string());
    }
    args.push(source.to_string());
    args.push(dest.to_string());
    args
}

/// Stale cached state from the remote environment is worse than no cache.
async fn clear_caches(wp: &impl WpCli, ctx: &OutputContext) -> Result<()> {
    for args in [
        ["rewrite", "flush"].as_slice(),
        ["transient", "delete", "--all"].as_slice(),
        ["cache", "flush"].as_slice(),
    ] {
        let output = wp.run(args).await?;
        require_success(&format!("wp {}", args.join(" ")), output)?;
    }
    ctx.info("Caches cleared");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
