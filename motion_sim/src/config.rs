//! Simulated axis configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [[axis]]
//! name = "theta"
//! speed = 10.0
//! positive_limit_switch = 50.0
//! negative_limit_switch = -50.0
//! home_switch = 0.0
//! ```
//!
//! Positions are raw controller units, speeds raw units per second.

use motion_common::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One simulated axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimAxisConfig {
    pub name: String,

    /// Speed at power-up.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Highest speed the axis accepts. 0 means unbounded.
    #[serde(default)]
    pub maximum_speed: f64,

    /// Physical position of the positive limit switch, if fitted.
    #[serde(default)]
    pub positive_limit_switch: Option<f64>,

    /// Physical position of the negative limit switch, if fitted.
    #[serde(default)]
    pub negative_limit_switch: Option<f64>,

    /// Physical position of the home switch.
    #[serde(default)]
    pub home_switch: f64,

    /// Seconds between a start command and the axis reporting motion.
    #[serde(default)]
    pub start_latency: f64,

    /// Position at power-up.
    #[serde(default)]
    pub initial_position: f64,
}

fn default_speed() -> f64 {
    10.0
}

impl SimAxisConfig {
    /// Axis with default speed and no limit switches.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            speed: default_speed(),
            maximum_speed: 0.0,
            positive_limit_switch: None,
            negative_limit_switch: None,
            home_switch: 0.0,
            start_latency: 0.0,
            initial_position: 0.0,
        }
    }

    /// Fits limit switches at `negative` and `positive`.
    pub fn with_limit_switches(mut self, negative: f64, positive: f64) -> Self {
        self.negative_limit_switch = Some(negative);
        self.positive_limit_switch = Some(positive);
        self
    }

    /// Validate the axis.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `speed` is not positive
    /// - `start_latency` is negative
    /// - the negative switch lies above the positive one
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis '{}': speed must be positive, got {}",
                self.name, self.speed
            )));
        }
        if self.start_latency < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "axis '{}': start_latency cannot be negative",
                self.name
            )));
        }
        if let (Some(negative), Some(positive)) =
            (self.negative_limit_switch, self.positive_limit_switch)
            && negative >= positive
        {
            return Err(ConfigError::ValidationError(format!(
                "axis '{}': negative limit switch {negative} must lie below positive {positive}",
                self.name
            )));
        }
        Ok(())
    }
}

/// A simulated controller's axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default, rename = "axis")]
    pub axes: Vec<SimAxisConfig>,
}

impl SimConfig {
    /// Validates every axis and rejects duplicate names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for axis in &self.axes {
            axis.validate()?;
            if !names.insert(axis.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate axis name '{}'",
                    axis.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_common::config::ConfigLoader;

    #[test]
    fn test_parse_axes() {
        let config = SimConfig::from_toml_str(
            r#"
[[axis]]
name = "theta"
positive_limit_switch = 50.0
negative_limit_switch = -50.0

[[axis]]
name = "chi"
speed = 2.5
start_latency = 0.1
"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.axes.len(), 2);
        assert_eq!(config.axes[0].speed, 10.0);
        assert_eq!(config.axes[0].positive_limit_switch, Some(50.0));
        assert_eq!(config.axes[1].negative_limit_switch, None);
        assert_eq!(config.axes[1].start_latency, 0.1);
    }

    #[test]
    fn test_validate_rejects_bad_axes() {
        let mut axis = SimAxisConfig::new("a");
        axis.speed = 0.0;
        assert!(axis.validate().is_err());

        let axis = SimAxisConfig::new("a").with_limit_switches(5.0, -5.0);
        assert!(axis.validate().is_err());

        let config = SimConfig {
            axes: vec![SimAxisConfig::new("a"), SimAxisConfig::new("a")],
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }
}
