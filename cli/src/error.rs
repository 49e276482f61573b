//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Settings errors ───────────────────────────────────────────────────────────

/// Errors resolving synchronisation settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(
        "Missing required setting {0}. Set it as an environment variable, in the project .env file, or as a config constant."
    )]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error(
        "Sync is not allowed when the environment is \"{0}\". Allowed environments: development, local, staging."
    )]
    EnvironmentNotAllowed(String),

    #[error("Could not determine the current environment. Set WP_ENV in your .env file.")]
    EnvironmentUnknown,
}

// ── Remote host errors ────────────────────────────────────────────────────────

/// Errors talking to the remote environment over SSH.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Cannot reach {user}@{host} on port {port}. Check your connection settings and VPN.")]
    Unreachable {
        user: String,
        host: String,
        port: u16,
    },

    #[error("Could not find a usable WP-CLI binary on the remote host under {path}")]
    WpCliNotFound { path: String },
}

// ── Domain validation errors ──────────────────────────────────────────────────

/// Domain-name validation failures for post-launch replacements.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(
        "\"{0}\" is not a valid domain. If you have a complex replacement please use `wp search-replace`"
    )]
    InvalidHostname(String),

    #[error("--new-domain is required when --old-domain is given")]
    MissingNewDomain,
}
