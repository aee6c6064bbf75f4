//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};
use crate::error::ConfigError;

/// Environment variable that overrides [`LogConfig::filter`].
pub const LOG_ENV_VAR: &str = "JOLT_LOG";

/// Builds the filter: `JOLT_LOG` if set and valid, else the configured one.
///
/// # Errors
///
/// Returns [`ConfigError::Filter`] if the configured directive is invalid.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| ConfigError::Filter {
        filter: config.filter.clone(),
        reason: err.to_string(),
    })
}

/// Installs a global fmt subscriber.
///
/// # Errors
///
/// Returns [`ConfigError::Filter`] for a bad directive and
/// [`ConfigError::Install`] if a global subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| ConfigError::Install(err.to_string()))
}
