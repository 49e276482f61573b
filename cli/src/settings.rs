//! Connection and behavior settings for sync.
//!
//! Every key resolves through the same cascade: process environment variable,
//! then the project `.env` file, then a `wp config` constant. The first
//! non-empty value wins.

use anyhow::Result;

use crate::error::SettingsError;
use crate::project::Project;
use crate::tools::remote::SshConnection;
use crate::tools::wp::{self, WpCli};

pub const SSH_HOST: &str = "ORBIT_SSH_HOST";
pub const SSH_USER: &str = "ORBIT_SSH_USER";
pub const SSH_PATH: &str = "ORBIT_SSH_PATH";
pub const SSH_PORT: &str = "ORBIT_SSH_PORT";
pub const ACTIVATE_PLUGINS: &str = "ORBIT_SYNC_ACTIVATE_PLUGINS";
pub const DEACTIVATE_PLUGINS: &str = "ORBIT_SYNC_DEACTIVATE_PLUGINS";
pub const ENVIRONMENT_KEY: &str = "WP_ENV";

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Environments sync is allowed to overwrite. Everything else, production
/// above all, is refused.
pub const SYNCABLE_ENVIRONMENTS: [&str; 3] = ["development", "local", "staging"];

/// Resolved connection settings for the remote environment.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub host: String,
    pub user: String,
    pub remote_path: String,
    pub port: u16,
    pub activate_plugins: Vec<String>,
    pub deactivate_plugins: Vec<String>,
}

impl SyncSettings {
    /// Resolve all sync settings through the cascade.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingKey`] when a required key resolves to
    /// nothing, and [`SettingsError::InvalidValue`] when the port is not a
    /// valid number.
    pub async fn resolve(project: &Project, wp: &impl WpCli) -> Result<Self> {
        let host = require(project, wp, SSH_HOST).await?;
        let user = require(project, wp, SSH_USER).await?;
        let remote_path = require(project, wp, SSH_PATH).await?;

        let port = match lookup(project, wp, SSH_PORT).await? {
            None => DEFAULT_SSH_PORT,
            Some(raw) => raw.parse().map_err(|_| SettingsError::InvalidValue {
                key: SSH_PORT,
                value: raw,
            })?,
        };

        let activate_plugins = lookup(project, wp, ACTIVATE_PLUGINS)
            .await?
            .map(|raw| parse_csv_list(&raw))
            .unwrap_or_default();
        let deactivate_plugins = lookup(project, wp, DEACTIVATE_PLUGINS)
            .await?
            .map(|raw| parse_csv_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            host,
            user,
            remote_path,
            port,
            activate_plugins,
            deactivate_plugins,
        })
    }

    #[must_use]
    pub fn connection(&self) -> SshConnection {
        SshConnection {
            user: self.user.clone(),
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// The environment tag from the process environment or `.env` only.
///
/// This is the cheap pre-flight form, usable before WP-CLI has been located;
/// [`environment_tag`] adds the `wp config` layer.
///
/// # Errors
///
/// Returns an error if the `.env` file exists but cannot be read.
pub fn environment_tag_early(project: &Project) -> Result<Option<String>> {
    if let Some(value) = env_var(ENVIRONMENT_KEY) {
        return Ok(Some(value));
    }
    Ok(project
        .env_value(ENVIRONMENT_KEY)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// The environment tag through the full cascade.
///
/// # Errors
///
/// Returns an error if the `.env` file is unreadable or WP-CLI cannot be
/// spawned.
pub async fn environment_tag(project: &Project, wp: &impl WpCli) -> Result<Option<String>> {
    lookup(project, wp, ENVIRONMENT_KEY).await
}

/// Refuse to continue unless the environment tag names one of the
/// [`SYNCABLE_ENVIRONMENTS`].
///
/// # Errors
///
/// Returns [`SettingsError::EnvironmentUnknown`] when no tag was resolved and
/// [`SettingsError::EnvironmentNotAllowed`] for any tag outside the
/// allow-list.
pub fn ensure_syncable_environment(tag: Option<&str>) -> Result<(), SettingsError> {
    match tag {
        None => Err(SettingsError::EnvironmentUnknown),
        Some(tag) if SYNCABLE_ENVIRONMENTS.contains(&tag) => Ok(()),
        Some(tag) => Err(SettingsError::EnvironmentNotAllowed(tag.to_string())),
    }
}

/// Split a comma-separated list: trim entries, drop empties, de-duplicate
/// preserving first occurrence. Used for plugin slugs and domain lists alike.
#[must_use]
pub fn parse_csv_list(raw: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if !entry.is_empty() && !entries.iter().any(|e| e == entry) {
            entries.push(entry.to_string());
        }
    }
    entries
}

async fn require(project: &Project, wp: &impl WpCli, key: &'static str) -> Result<String> {
    lookup(project, wp, key)
        .await?
        .ok_or_else(|| SettingsError::MissingKey(key).into())
}

async fn lookup(project: &Project, wp: &impl WpCli, key: &str) -> Result<Option<String>> {
    if let Some(value) = env_var(key) {
        return Ok(Some(value));
    }
    if let Some(value) = project.env_value(key)? {
        let value = value.trim().to_string();
        if !value.is_empty() {
            return Ok(Some(value));
        }
    }
    wp::config_get(wp, key).await
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
