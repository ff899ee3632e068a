//! CLI command implementations.

pub mod admin;
pub mod seed;

use classfete_site::backend::{BackendError, HostedBackend};
use classfete_site::config::{ConfigError, SiteConfig};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("BACKEND_URL is not set; the CLI only works against the hosted backend")]
    NoBackend,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("no user with email {0}")]
    UserNotFound(String),

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid seed data: {0}")]
    Invalid(String),
}

/// Connect to the hosted backend configured in the environment.
///
/// # Errors
///
/// Returns [`CliError::NoBackend`] when `BACKEND_URL` is unset.
pub fn connect() -> Result<HostedBackend, CliError> {
    let config = SiteConfig::from_env()?;
    let backend = config.backend.as_ref().ok_or(CliError::NoBackend)?;
    tracing::info!(url = %backend.url, "connecting to backend");
    Ok(HostedBackend::new(backend, &config.storage_bucket)?)
}
