// Logging module for structured logging using the tracing crate

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{HttpCacheError, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`. Output goes to
/// stdout, as JSON lines or human-readable text depending on `config.format`.
///
/// # Errors
///
/// Fails if the level is not a valid filter directive or a global subscriber
/// is already installed.
///
/// # Examples
///
/// ```no_run
/// use httpcache::config::LoggingConfig;
/// use httpcache::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    result.map_err(|e| HttpCacheError::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| HttpCacheError::Config(format!("Invalid log level '{}': {}", config.level, e))),
    }
}
