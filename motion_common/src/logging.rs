//! Tracing subscriber setup.
//!
//! Installs a `tracing-subscriber` fmt layer once per process. The filter
//! starts from `RUST_LOG` and adds the configured level as a directive.

use crate::config::{LogLevel, LoggingConfig};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Error returned when a global subscriber is already installed.
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Builds the env filter for `config`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(Level::from(config.level).into())
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if a global subscriber has already been set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InitError> {
    let filter = env_filter(config);

    if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .try_init()
    }
}
