//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration
//! for a motion session: logging, poll-loop settings and motor records.
//!
//! # Usage
//!
//! ```rust,no_run
//! use motion_common::config::{ConfigLoader, MotionConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MotionConfig::load(Path::new("motion.toml"))?;
//!     config.validate()?;
//!     println!("{} motors", config.motors.len());
//!     Ok(())
//! }
//! ```

use crate::motor::MotorConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging output settings.
///
/// # TOML Example
///
/// ```toml
/// [logging]
/// level = "debug"
/// json = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub json: bool,
}

/// Process-wide knobs for the cooperative poll loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSettings {
    /// Sleep between wait-loop iterations, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,

    /// Emit position progress on every wait, not only `SHOW_MOVE` ones.
    #[serde(default)]
    pub show_progress: bool,

    /// Seconds between progress lines.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: f64,

    /// Attempts made to back off a limit switch before giving up.
    #[serde(default = "default_push_off_attempts")]
    pub push_off_attempts: u32,

    /// Seconds between push-off checks.
    #[serde(default = "default_push_off_interval")]
    pub push_off_interval: f64,

    /// Longest pseudomotor chain accepted before assuming a cycle.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,
}

fn default_poll_interval() -> f64 {
    0.01
}
fn default_progress_interval() -> f64 {
    1.0
}
fn default_push_off_attempts() -> u32 {
    10
}
fn default_push_off_interval() -> f64 {
    1.0
}
fn default_max_chain_depth() -> usize {
    16
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            show_progress: false,
            progress_interval: default_progress_interval(),
            push_off_attempts: default_push_off_attempts(),
            push_off_interval: default_push_off_interval(),
            max_chain_depth: default_max_chain_depth(),
        }
    }
}

impl MotionSettings {
    pub fn poll_duration(&self) -> Duration {
        crate::clock::duration_from_secs(self.poll_interval)
    }

    pub fn progress_duration(&self) -> Duration {
        crate::clock::duration_from_secs(self.progress_interval)
    }

    pub fn push_off_duration(&self) -> Duration {
        crate::clock::duration_from_secs(self.push_off_interval)
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `poll_interval` is not a positive finite number
    /// - `push_off_attempts` or `max_chain_depth` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.poll_interval.is_finite() && self.poll_interval > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "poll_interval must be positive, got {}",
                self.poll_interval
            )));
        }
        if self.push_off_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "push_off_attempts cannot be zero".to_string(),
            ));
        }
        if self.max_chain_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_chain_depth cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete session configuration.
///
/// # TOML Example
///
/// ```toml
/// [logging]
/// level = "info"
///
/// [settings]
/// poll_interval = 0.01
///
/// [[motor]]
/// name = "theta"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub settings: MotionSettings,

    #[serde(default, rename = "motor")]
    pub motors: Vec<MotorConfig>,
}

impl MotionConfig {
    /// Validate settings and every motor, and require unique motor names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        let mut names = HashSet::new();
        for motor in &self.motors {
            motor.validate()?;
            if !names.insert(motor.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate motor name '{}'",
                    motor.name
                )));
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::HomeSearchType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = MotionSettings::default();
        assert_eq!(settings.poll_duration(), Duration::from_millis(10));
        assert_eq!(settings.push_off_attempts, 10);
        assert_eq!(settings.push_off_duration(), Duration::from_secs(1));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let settings = MotionSettings {
            poll_interval: 0.0,
            ..MotionSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"

[settings]
poll_interval = 0.02

[[motor]]
name = "theta"
scale = 0.5

[[motor]]
name = "chi"
subclass = "analog"
home_search = "halfway_between_limit_switches"
"#
        )
        .unwrap();

        let config = MotionConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.settings.poll_interval, 0.02);
        assert_eq!(config.motors.len(), 2);
        assert_eq!(config.motors[1].home_search, HomeSearchType::HalfwayBetweenLimitSwitches);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let result = MotionConfig::load(Path::new("/nonexistent/motion.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = MotionConfig::from_toml_str("[[motor]\nname = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_duplicate_motor_names_rejected() {
        let config = MotionConfig::from_toml_str(
            "[[motor]]\nname = \"a\"\n[[motor]]\nname = \"a\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("duplicate")
        ));
    }
}
