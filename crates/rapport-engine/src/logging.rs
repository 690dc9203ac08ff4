//! Tracing subscriber setup for hosts that do not install their own

use crate::config::{ConfigError, LoggingSettings};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over `settings.filter`. Returns `Ok(false)`
/// when a global subscriber was already installed.
pub fn init(settings: &LoggingSettings) -> Result<bool, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.filter).map_err(|e| ConfigError::Invalid {
            field: "logging.filter".to_string(),
            reason: e.to_string(),
        })?,
    };

    Ok(tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_ok())
}
