//! Tracing setup for hosts embedding the comparison service.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

/// Build the log filter: `RUST_LOG` when set and valid, else `config.filter`.
///
/// # Errors
///
/// Returns [`AppError::Config`] if `RUST_LOG` is unusable and
/// `config.filter` does not parse either.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.filter),
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| AppError::Config(format!("invalid logging.filter {directives:?}: {e}")))
}

/// Install a global `fmt` subscriber.
///
/// # Errors
///
/// Returns [`AppError::Config`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .try_init()
        .map_err(|e| AppError::Config(format!("failed to install tracing subscriber: {e}")))
}
