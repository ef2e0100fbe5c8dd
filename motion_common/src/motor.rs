//! Per-motor configuration types.
//!
//! [`MotorConfig`] holds the neutral defaults a motor record is created
//! with. Raw values are given as floats and rounded to whole steps for
//! stepper motors when the record is built.

use crate::config::ConfigError;
use crate::error::{MotorError, MotorResult};
use crate::status::MotorFlags;
use crate::units::MotorSubclass;
use serde::{Deserialize, Serialize};

/// How the acceleration parameters are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccelerationType {
    /// No acceleration model; time and distance are 0.
    #[default]
    None,
    /// `raw_acceleration_parameters[0]` is the acceleration in raw units/s².
    Rate,
    /// `raw_acceleration_parameters[0]` is the ramp time in seconds.
    Time,
}

/// Home-search strategy.
///
/// | Strategy                          | First move           | Home move                  |
/// |-----------------------------------|----------------------|----------------------------|
/// | `RawHomeCommand`                  | none                 | driver home command        |
/// | `SameDirLimitThenRawHome`         | limit, same dir      | driver home command        |
/// | `OppositeDirLimitThenRawHome`     | limit, opposite dir  | driver home command        |
/// | `LimitSwitchAsHomeSwitch`         | none                 | home command on limit      |
/// | `SameDirLimitThenLimitAsHome`     | limit, same dir      | home command on limit      |
/// | `OppositeDirLimitThenLimitAsHome` | limit, opposite dir  | home command on limit      |
/// | `HalfwayBetweenLimitSwitches`     | both limits          | move to midpoint, zero it  |
/// | `Special`                         | driver callback      | driver callback            |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HomeSearchType {
    #[default]
    RawHomeCommand = 0,
    SameDirLimitThenRawHome = 1,
    OppositeDirLimitThenRawHome = 2,
    LimitSwitchAsHomeSwitch = 3,
    SameDirLimitThenLimitAsHome = 4,
    OppositeDirLimitThenLimitAsHome = 5,
    HalfwayBetweenLimitSwitches = 6,
    Special = 7,
}

impl HomeSearchType {
    /// Convert from raw u8 value.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::RawHomeCommand),
            1 => Some(Self::SameDirLimitThenRawHome),
            2 => Some(Self::OppositeDirLimitThenRawHome),
            3 => Some(Self::LimitSwitchAsHomeSwitch),
            4 => Some(Self::SameDirLimitThenLimitAsHome),
            5 => Some(Self::OppositeDirLimitThenLimitAsHome),
            6 => Some(Self::HalfwayBetweenLimitSwitches),
            7 => Some(Self::Special),
            _ => None,
        }
    }

    /// Like [`Self::from_u8`], failing with `IllegalArgument`.
    pub fn try_from_u8(v: u8) -> MotorResult<Self> {
        Self::from_u8(v).ok_or_else(|| {
            MotorError::IllegalArgument(format!("Unknown home search type {v}"))
        })
    }

    /// Whether a limit-switch move precedes the home move.
    pub const fn uses_two_moves(self) -> bool {
        matches!(
            self,
            Self::SameDirLimitThenRawHome
                | Self::OppositeDirLimitThenRawHome
                | Self::SameDirLimitThenLimitAsHome
                | Self::OppositeDirLimitThenLimitAsHome
        )
    }

    /// Whether the first move goes toward the limit in the home direction.
    pub const fn limit_in_same_direction(self) -> bool {
        matches!(
            self,
            Self::SameDirLimitThenRawHome | Self::SameDirLimitThenLimitAsHome
        )
    }

    /// Whether the home command runs with a limit switch bound as home switch.
    pub const fn uses_limit_switch_as_home_switch(self) -> bool {
        matches!(
            self,
            Self::LimitSwitchAsHomeSwitch
                | Self::SameDirLimitThenLimitAsHome
                | Self::OppositeDirLimitThenLimitAsHome
        )
    }
}

/// Input the controller treats as the home switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HomeSwitch {
    #[default]
    HomeInput,
    PositiveLimit,
    NegativeLimit,
}

impl HomeSwitch {
    /// Limit switch lying in the direction of `direction`.
    pub const fn limit_in_direction(direction: i32) -> Self {
        if direction >= 0 {
            Self::PositiveLimit
        } else {
            Self::NegativeLimit
        }
    }
}

/// Neutral defaults for one motor record.
///
/// # TOML Example
///
/// ```toml
/// [[motor]]
/// name = "theta"
/// subclass = "stepper"
/// scale = 0.001
/// raw_positive_limit = 50000
/// raw_negative_limit = -50000
/// raw_backlash_correction = 200
/// home_search = "halfway_between_limit_switches"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    pub name: String,

    #[serde(default)]
    pub subclass: MotorSubclass,

    /// Engineering units label, e.g. "mm" or "deg".
    #[serde(default)]
    pub units: String,

    #[serde(default = "default_scale")]
    pub scale: f64,

    #[serde(default)]
    pub offset: f64,

    #[serde(default = "default_raw_positive_limit")]
    pub raw_positive_limit: f64,

    #[serde(default = "default_raw_negative_limit")]
    pub raw_negative_limit: f64,

    #[serde(default)]
    pub raw_backlash_correction: f64,

    #[serde(default)]
    pub raw_move_deadband: f64,

    #[serde(default)]
    pub raw_speed: f64,

    #[serde(default)]
    pub raw_base_speed: f64,

    #[serde(default)]
    pub raw_maximum_speed: f64,

    /// -1 means unbounded; any other negative value forbids speed changes.
    #[serde(default = "default_speed_limit")]
    pub raw_maximum_speed_limit: f64,

    /// -1 means unbounded; any other negative value forbids speed changes.
    #[serde(default = "default_speed_limit")]
    pub raw_minimum_speed_limit: f64,

    #[serde(default)]
    pub acceleration_type: AccelerationType,

    #[serde(default)]
    pub raw_acceleration_parameters: [f64; 4],

    /// Seconds; zero or negative disables the busy-start window.
    #[serde(default)]
    pub busy_start_interval: f64,

    #[serde(default)]
    pub home_search: HomeSearchType,

    #[serde(default)]
    pub home_switch: HomeSwitch,

    #[serde(default)]
    pub pseudomotor: bool,

    #[serde(default)]
    pub remote: bool,

    /// Name of the motor this one is layered on.
    #[serde(default)]
    pub real_motor: Option<String>,
}

fn default_scale() -> f64 {
    1.0
}
fn default_raw_positive_limit() -> f64 {
    1.0e9
}
fn default_raw_negative_limit() -> f64 {
    -1.0e9
}
fn default_speed_limit() -> f64 {
    -1.0
}

impl MotorConfig {
    /// Config with every optional field at its default.
    pub fn new(name: &str, subclass: MotorSubclass) -> Self {
        Self {
            name: name.to_string(),
            subclass,
            units: String::new(),
            scale: default_scale(),
            offset: 0.0,
            raw_positive_limit: default_raw_positive_limit(),
            raw_negative_limit: default_raw_negative_limit(),
            raw_backlash_correction: 0.0,
            raw_move_deadband: 0.0,
            raw_speed: 0.0,
            raw_base_speed: 0.0,
            raw_maximum_speed: 0.0,
            raw_maximum_speed_limit: default_speed_limit(),
            raw_minimum_speed_limit: default_speed_limit(),
            acceleration_type: AccelerationType::None,
            raw_acceleration_parameters: [0.0; 4],
            busy_start_interval: 0.0,
            home_search: HomeSearchType::RawHomeCommand,
            home_switch: HomeSwitch::HomeInput,
            pseudomotor: false,
            remote: false,
            real_motor: None,
        }
    }

    /// Static flags implied by this config.
    pub fn flags(&self) -> MotorFlags {
        let mut flags = MotorFlags::empty();
        flags.set(MotorFlags::IS_PSEUDOMOTOR, self.pseudomotor);
        flags.set(MotorFlags::IS_REMOTE_MOTOR, self.remote);
        flags
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `name` is empty
    /// - `scale` is zero or not finite
    /// - the negative limit lies above the positive limit
    /// - a layered motor has no `real_motor`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "motor name cannot be empty".to_string(),
            ));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "motor '{}': scale must be finite and non-zero, got {}",
                self.name, self.scale
            )));
        }
        if self.raw_negative_limit > self.raw_positive_limit {
            return Err(ConfigError::ValidationError(format!(
                "motor '{}': raw_negative_limit {} is above raw_positive_limit {}",
                self.name, self.raw_negative_limit, self.raw_positive_limit
            )));
        }
        if (self.pseudomotor || self.remote) && self.real_motor.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "motor '{}': layered motors need a real_motor",
                self.name
            )));
        }
        Ok(())
    }
}
