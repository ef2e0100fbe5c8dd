//! Speed, acceleration and servo gain management.
//!
//! Every value here moves through the driver's `get_parameter` /
//! `set_parameter` slots. Derived quantities (acceleration time and
//! distance, extended scan ranges, speed between positions, saved speed)
//! are computed here from the primitive parameters.
//!
//! # Acceleration Models
//!
//! | Type   | `raw_acceleration_parameters[0]` | time            | distance             |
//! |--------|----------------------------------|-----------------|----------------------|
//! | `Rate` | acceleration `a`                 | `(v - v0) / a`  | `(v² - v0²) / 2a`    |
//! | `Time` | ramp time `t`                    | `t`             | `(v + v0) · t / 2`   |
//! | `None` | unused                           | 0               | 0                    |

use super::Motor;
use crate::driver::Parameter;
use motion_common::error::{MotorError, MotorResult};
use motion_common::motor::AccelerationType;
use motion_common::status::MotorFlags;
use motion_common::units::{round_steps, safe_divide};
use tracing::debug;

/// Largest difference between a saved and a restored speed, in
/// engineering units per second.
const SPEED_RESTORE_TOLERANCE: f64 = 0.001;

/// Which speed a proposed value is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedKind {
    Speed,
    BaseSpeed,
}

impl SpeedKind {
    fn label(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::BaseSpeed => "base speed",
        }
    }
}

/// Servo loop gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    Proportional,
    Integral,
    Derivative,
    VelocityFeedforward,
    AccelerationFeedforward,
    IntegralLimit,
    Extra,
}

impl Gain {
    pub const fn parameter(self) -> Parameter {
        match self {
            Self::Proportional => Parameter::ProportionalGain,
            Self::Integral => Parameter::IntegralGain,
            Self::Derivative => Parameter::DerivativeGain,
            Self::VelocityFeedforward => Parameter::VelocityFeedforwardGain,
            Self::AccelerationFeedforward => Parameter::AccelerationFeedforwardGain,
            Self::IntegralLimit => Parameter::IntegralLimit,
            Self::Extra => Parameter::ExtraGain,
        }
    }
}

/// `true` unless `raw_limit` is a negative value other than the -1
/// "unbounded" marker.
fn speed_limit_allows_change(raw_limit: f64) -> bool {
    raw_limit >= 0.0 || round_steps(raw_limit) == -1
}

impl Motor {
    // ─── Parameter Slots ────────────────────────────────────────────

    fn parameter_slot_missing(&mut self, operation: &str) -> MotorError {
        self.state.flags |= MotorFlags::CANNOT_CHANGE_SPEED;
        MotorError::unsupported(&self.state.name, operation)
    }

    /// Reads `parameter` through the driver. Absence is `Unsupported`.
    pub(crate) fn get_parameter_required(
        &mut self,
        parameter: Parameter,
        operation: &str,
    ) -> MotorResult<()> {
        match self.driver.get_parameter(&mut self.state, parameter) {
            Some(result) => result,
            None => Err(self.parameter_slot_missing(operation)),
        }
    }

    /// Writes `parameter` through the driver. Absence is `Unsupported`.
    pub(crate) fn set_parameter_required(
        &mut self,
        parameter: Parameter,
        operation: &str,
    ) -> MotorResult<()> {
        match self.driver.set_parameter(&mut self.state, parameter) {
            Some(result) => result,
            None => Err(self.parameter_slot_missing(operation)),
        }
    }

    /// Writes `parameter` through the driver if it can take it.
    pub(crate) fn set_parameter_optional(&mut self, parameter: Parameter) -> MotorResult<()> {
        match self.driver.set_parameter(&mut self.state, parameter) {
            Some(result) => result,
            None => {
                self.state.flags |= MotorFlags::CANNOT_CHANGE_SPEED;
                Ok(())
            }
        }
    }

    /// Whether the driver was found unable to change speeds.
    pub fn cannot_change_speed(&self) -> bool {
        self.state.flags.contains(MotorFlags::CANNOT_CHANGE_SPEED)
    }

    // ─── Speeds ─────────────────────────────────────────────────────

    /// Current speed in engineering units per second.
    pub fn speed(&mut self) -> MotorResult<f64> {
        self.get_parameter_required(Parameter::Speed, "speed")?;
        self.state.refresh_speeds();
        Ok(self.state.speed)
    }

    pub fn set_speed(&mut self, speed: f64) -> MotorResult<()> {
        self.check_speed_limits(SpeedKind::Speed, speed)?;
        let raw = safe_divide(speed, self.state.scaling.scale.abs());
        self.write_raw_speed(raw)
    }

    pub fn base_speed(&mut self) -> MotorResult<f64> {
        self.get_parameter_required(Parameter::BaseSpeed, "base_speed")?;
        self.state.refresh_speeds();
        Ok(self.state.base_speed)
    }

    pub fn set_base_speed(&mut self, base_speed: f64) -> MotorResult<()> {
        self.check_speed_limits(SpeedKind::BaseSpeed, base_speed)?;
        let previous = self.state.raw_base_speed;
        self.state.raw_base_speed = safe_divide(base_speed, self.state.scaling.scale.abs());
        self.estimate.invalidate();
        let result = self.set_parameter_required(Parameter::BaseSpeed, "set_base_speed");
        if result.is_err() {
            self.state.raw_base_speed = previous;
        }
        self.state.refresh_speeds();
        result
    }

    pub fn maximum_speed(&mut self) -> MotorResult<f64> {
        self.get_parameter_required(Parameter::MaximumSpeed, "maximum_speed")?;
        self.state.refresh_speeds();
        Ok(self.state.maximum_speed)
    }

    /// Always `Unsupported`: the maximum speed is a property of the
    /// controller.
    pub fn set_maximum_speed(&mut self, _maximum_speed: f64) -> MotorResult<()> {
        Err(MotorError::unsupported(&self.state.name, "set_maximum_speed"))
    }

    /// Current speed in raw units per second.
    pub fn raw_speed(&mut self) -> MotorResult<f64> {
        self.get_parameter_required(Parameter::Speed, "raw_speed")?;
        self.state.refresh_speeds();
        Ok(self.state.raw_speed)
    }

    pub fn set_raw_speed(&mut self, raw_speed: f64) -> MotorResult<()> {
        let speed = raw_speed * self.state.scaling.scale.abs();
        self.check_speed_limits(SpeedKind::Speed, speed)?;
        self.write_raw_speed(raw_speed)
    }

    fn write_raw_speed(&mut self, raw_speed: f64) -> MotorResult<()> {
        let previous = self.state.raw_speed;
        self.state.raw_speed = raw_speed;
        self.estimate.invalidate();
        let result = self.set_parameter_required(Parameter::Speed, "set_speed");
        if result.is_err() {
            self.state.raw_speed = previous;
        }
        self.state.refresh_speeds();
        result
    }

    /// Validates a proposed engineering speed without changing anything.
    ///
    /// # Errors
    ///
    /// - `IllegalArgument` for a negative speed.
    /// - `PermissionDenied` if a speed limit forbids changes or the
    ///   proposed speed lies outside the configured limits.
    /// - `WouldExceedLimit` if a speed would drop below the base speed, or
    ///   a base speed would rise above the speed.
    pub fn check_speed_limits(&self, kind: SpeedKind, proposed: f64) -> MotorResult<()> {
        let state = &self.state;
        let label = kind.label();
        let name = &state.name;
        let units = &state.units;
        let factor = state.scaling.scale.abs();
        let proposed_raw = safe_divide(proposed, factor);

        if proposed < 0.0 {
            return Err(MotorError::IllegalArgument(format!(
                "The {label} of {proposed} {units}/sec requested for motor '{name}' is illegal. \
                 Motor speeds must not be negative numbers."
            )));
        }

        let max_limit = state.raw_maximum_speed_limit;
        let min_limit = state.raw_minimum_speed_limit;
        if !speed_limit_allows_change(max_limit) || !speed_limit_allows_change(min_limit) {
            return Err(MotorError::PermissionDenied(format!(
                "The {label} of motor '{name}' is not allowed to be changed."
            )));
        }
        if max_limit >= 0.0 && proposed_raw > max_limit {
            return Err(MotorError::PermissionDenied(format!(
                "The {label} of {proposed} {units}/sec requested for '{name}' is above the \
                 maximum allowed speed of {} {units}/sec.",
                max_limit * factor
            )));
        }
        if min_limit >= 0.0 && proposed_raw < min_limit {
            return Err(MotorError::PermissionDenied(format!(
                "The {label} of {proposed} {units}/sec requested for '{name}' is below the \
                 minimum allowed speed of {} {units}/sec.",
                min_limit * factor
            )));
        }

        match kind {
            SpeedKind::Speed if proposed_raw < state.raw_base_speed => {
                Err(MotorError::WouldExceedLimit(format!(
                    "The {label} of {proposed} {units}/sec requested for '{name}' is below the \
                     current base speed of {} {units}/sec.",
                    state.raw_base_speed * factor
                )))
            }
            SpeedKind::BaseSpeed if proposed_raw > state.raw_speed => {
                Err(MotorError::WouldExceedLimit(format!(
                    "The {label} of {proposed} {units}/sec requested for '{name}' is above the \
                     current speed of {} {units}/sec.",
                    state.raw_speed * factor
                )))
            }
            _ => Ok(()),
        }
    }

    /// Remembers the current speed and synchronous motion mode.
    pub fn save_speed(&mut self) -> MotorResult<()> {
        self.get_parameter_required(Parameter::Speed, "save_speed")?;
        self.state.refresh_speeds();
        self.state.raw_saved_speed = self.state.raw_speed;
        self.state.saved_synchronous_motion_mode = self.state.synchronous_motion_mode;
        debug!(motor = %self.state.name, raw_speed = self.state.raw_saved_speed, "Speed saved");
        Ok(())
    }

    /// Restores the speed and synchronous motion mode saved by
    /// [`save_speed`](Self::save_speed).
    ///
    /// # Errors
    ///
    /// Returns `DeviceActionFailed` if the speed read back afterwards
    /// differs from the saved one.
    pub fn restore_speed(&mut self) -> MotorResult<()> {
        let factor = self.state.scaling.scale.abs();
        let saved = self.state.raw_saved_speed * factor;

        self.set_raw_speed(self.state.raw_saved_speed)?;
        let current = self.speed()?;

        if (saved - current).abs() > SPEED_RESTORE_TOLERANCE {
            return Err(MotorError::DeviceActionFailed(format!(
                "The attempt to restore the speed of motor '{name}' to its original value of \
                 {saved} {units}/second failed. Instead, the current speed of motor '{name}' \
                 is {current} {units}/second.",
                name = self.state.name,
                units = self.state.units,
            )));
        }
        self.state.synchronous_motion_mode = self.state.saved_synchronous_motion_mode;
        Ok(())
    }

    pub fn synchronous_motion_mode(&mut self) -> MotorResult<bool> {
        self.get_parameter_required(Parameter::SynchronousMotionMode, "synchronous_motion_mode")?;
        Ok(self.state.synchronous_motion_mode)
    }

    pub fn set_synchronous_motion_mode(&mut self, enabled: bool) -> MotorResult<()> {
        self.state.synchronous_motion_mode = enabled;
        self.set_parameter_required(
            Parameter::SynchronousMotionMode,
            "set_synchronous_motion_mode",
        )
    }

    /// Sets the speed so that a constant-speed move from `position1` to
    /// `position2` takes `time_for_move` seconds.
    pub fn set_speed_between_positions(
        &mut self,
        position1: f64,
        position2: f64,
        time_for_move: f64,
    ) -> MotorResult<()> {
        let scale = self.state.scaling.scale;
        let raw1 = safe_divide(position1, scale);
        let raw2 = safe_divide(position2, scale);
        let raw_speed = safe_divide(raw2 - raw1, time_for_move).abs();
        self.set_raw_speed(raw_speed)
    }

    // ─── Acceleration ───────────────────────────────────────────────

    pub fn acceleration_type(&mut self) -> MotorResult<AccelerationType> {
        self.get_parameter_required(Parameter::AccelerationType, "acceleration_type")?;
        Ok(self.state.acceleration_type)
    }

    pub fn raw_acceleration_parameters(&mut self) -> MotorResult<[f64; 4]> {
        self.get_parameter_required(
            Parameter::RawAccelerationParameters,
            "raw_acceleration_parameters",
        )?;
        Ok(self.state.raw_acceleration_parameters)
    }

    pub fn set_raw_acceleration_parameters(&mut self, parameters: [f64; 4]) -> MotorResult<()> {
        self.state.raw_acceleration_parameters = parameters;
        self.estimate.invalidate();
        self.set_parameter_required(
            Parameter::RawAccelerationParameters,
            "set_raw_acceleration_parameters",
        )
    }

    /// Refreshes speed, base speed and acceleration parameters.
    fn refresh_motion_parameters(&mut self, operation: &str) -> MotorResult<()> {
        self.get_parameter_required(Parameter::Speed, operation)?;
        self.get_parameter_required(Parameter::BaseSpeed, operation)?;
        self.get_parameter_required(Parameter::RawAccelerationParameters, operation)?;
        self.state.refresh_speeds();
        Ok(())
    }

    /// Seconds needed to ramp from base speed to speed.
    pub fn acceleration_time(&mut self) -> MotorResult<f64> {
        self.refresh_motion_parameters("acceleration_time")?;
        let state = &mut self.state;
        let p0 = state.raw_acceleration_parameters[0];
        state.acceleration_time = match state.acceleration_type {
            AccelerationType::Rate => {
                safe_divide(state.raw_speed - state.raw_base_speed, p0).abs()
            }
            AccelerationType::Time => p0.abs(),
            AccelerationType::None => 0.0,
        };
        Ok(state.acceleration_time)
    }

    /// Changes the ramp time, rewriting the raw acceleration parameters.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` for motors without an acceleration model.
    pub fn set_acceleration_time(&mut self, seconds: f64) -> MotorResult<()> {
        self.refresh_motion_parameters("set_acceleration_time")?;
        let state = &mut self.state;
        let p0 = match state.acceleration_type {
            AccelerationType::Rate => {
                safe_divide(state.raw_speed - state.raw_base_speed, seconds).abs()
            }
            AccelerationType::Time => seconds.abs(),
            AccelerationType::None => {
                return Err(MotorError::Unsupported(format!(
                    "Cannot set the acceleration time for motor '{}' since it has no \
                     acceleration model.",
                    state.name
                )));
            }
        };
        state.acceleration_time = seconds.abs();
        self.set_raw_acceleration_parameters([p0, 0.0, 0.0, 0.0])
    }

    /// Engineering distance covered while ramping from base speed to speed.
    pub fn acceleration_distance(&mut self) -> MotorResult<f64> {
        self.refresh_motion_parameters("acceleration_distance")?;
        let state = &mut self.state;
        let (v, v0) = (state.raw_speed, state.raw_base_speed);
        let p0 = state.raw_acceleration_parameters[0];
        state.raw_acceleration_distance = match state.acceleration_type {
            AccelerationType::Rate => safe_divide(v * v - v0 * v0, 2.0 * p0).abs(),
            // Average of base speed and speed over the ramp time.
            AccelerationType::Time => ((v + v0) / 2.0 * p0).abs(),
            AccelerationType::None => 0.0,
        };
        state.acceleration_distance =
            (state.raw_acceleration_distance * state.scaling.scale).abs();
        Ok(state.acceleration_distance)
    }

    /// Widens a scan range so the motor is at full speed across all of
    /// `start..end`. Returns the new `(start, end)`.
    pub fn compute_extended_scan_range(&mut self, start: f64, end: f64) -> MotorResult<(f64, f64)> {
        self.acceleration_distance()?;
        let scale = self.state.scaling.scale;
        let distance = self.state.raw_acceleration_distance;
        let raw_start = safe_divide(start, scale);
        let raw_end = safe_divide(end, scale);

        let (real_start, real_end) = if raw_end >= raw_start {
            (raw_start - distance, raw_end + distance)
        } else {
            (raw_start + distance, raw_end - distance)
        };
        Ok((scale * real_start, scale * real_end))
    }

    // ─── Gains ──────────────────────────────────────────────────────

    pub fn gain(&mut self, gain: Gain) -> MotorResult<f64> {
        self.get_parameter_required(gain.parameter(), "gain")?;
        Ok(*self.gain_field(gain))
    }

    pub fn set_gain(&mut self, gain: Gain, value: f64) -> MotorResult<()> {
        *self.gain_field(gain) = value;
        self.set_parameter_required(gain.parameter(), "set_gain")
    }

    fn gain_field(&mut self, gain: Gain) -> &mut f64 {
        let g = &mut self.state.gains;
        match gain {
            Gain::Proportional => &mut g.proportional,
            Gain::Integral => &mut g.integral,
            Gain::Derivative => &mut g.derivative,
            Gain::VelocityFeedforward => &mut g.velocity_feedforward,
            Gain::AccelerationFeedforward => &mut g.acceleration_feedforward,
            Gain::IntegralLimit => &mut g.integral_limit,
            Gain::Extra => &mut g.extra,
        }
    }
}
