//! Default parameter handlers.
//!
//! Drivers that implement the parameter slots but have nothing special to
//! do for a given parameter delegate to these functions. Parameters only
//! cached in the record are accepted as-is; servo gains are forced to 0
//! because only drivers with real gain support may hold other values.

use crate::driver::Parameter;
use crate::state::MotorState;
use motion_common::error::{MotorError, MotorResult};

/// Default read of `parameter`.
pub fn default_get_parameter(motor: &mut MotorState, parameter: Parameter) -> MotorResult<()> {
    match parameter {
        Parameter::Speed
        | Parameter::BaseSpeed
        | Parameter::MaximumSpeed
        | Parameter::AccelerationType
        | Parameter::RawAccelerationParameters
        | Parameter::AxisEnable
        | Parameter::ClosedLoop
        | Parameter::FaultReset
        | Parameter::HomeSwitch
        | Parameter::SaveStartPositions
        | Parameter::UseStartPositions
        | Parameter::SynchronousMotionMode => {}
        gain => zero_gain(motor, gain),
    }
    Ok(())
}

/// Default write of `parameter`.
///
/// # Errors
///
/// Returns `WouldExceedLimit` when a new speed or base speed is negative,
/// above a known maximum speed, or inconsistent with the other speed.
pub fn default_set_parameter(motor: &mut MotorState, parameter: Parameter) -> MotorResult<()> {
    match parameter {
        Parameter::Speed => check_raw_speed(motor),
        Parameter::BaseSpeed => check_raw_base_speed(motor),
        Parameter::UseStartPositions => {
            motor.use_start_positions = false;
            Ok(())
        }
        Parameter::MaximumSpeed
        | Parameter::AccelerationType
        | Parameter::RawAccelerationParameters
        | Parameter::AxisEnable
        | Parameter::ClosedLoop
        | Parameter::FaultReset
        | Parameter::HomeSwitch
        | Parameter::SaveStartPositions
        | Parameter::SynchronousMotionMode => Ok(()),
        gain => {
            zero_gain(motor, gain);
            Ok(())
        }
    }
}

fn zero_gain(motor: &mut MotorState, gain: Parameter) {
    let g = &mut motor.gains;
    match gain {
        Parameter::ProportionalGain => g.proportional = 0.0,
        Parameter::IntegralGain => g.integral = 0.0,
        Parameter::DerivativeGain => g.derivative = 0.0,
        Parameter::VelocityFeedforwardGain => g.velocity_feedforward = 0.0,
        Parameter::AccelerationFeedforwardGain => g.acceleration_feedforward = 0.0,
        Parameter::IntegralLimit => g.integral_limit = 0.0,
        Parameter::ExtraGain => g.extra = 0.0,
        _ => {}
    }
}

// A raw maximum speed of 0 means the driver never reported one.
fn check_raw_speed(motor: &MotorState) -> MotorResult<()> {
    let raw_speed = motor.raw_speed;
    if raw_speed < 0.0 {
        return Err(MotorError::WouldExceedLimit(format!(
            "Requested raw speed {raw_speed} for motor '{}' is less than zero. \
             Raw motor speeds must be non-negative numbers.",
            motor.name
        )));
    }
    if motor.raw_maximum_speed > 0.0 && raw_speed > motor.raw_maximum_speed {
        return Err(MotorError::WouldExceedLimit(format!(
            "Requested raw speed {raw_speed} for motor '{}' is greater than \
             the raw maximum speed of {}.",
            motor.name, motor.raw_maximum_speed
        )));
    }
    if raw_speed < motor.raw_base_speed {
        return Err(MotorError::WouldExceedLimit(format!(
            "Requested raw speed {raw_speed} for motor '{}' is less than \
             the current raw base speed of {}.",
            motor.name, motor.raw_base_speed
        )));
    }
    Ok(())
}

fn check_raw_base_speed(motor: &MotorState) -> MotorResult<()> {
    let raw_base_speed = motor.raw_base_speed;
    if raw_base_speed < 0.0 {
        return Err(MotorError::WouldExceedLimit(format!(
            "Requested raw base speed {raw_base_speed} for motor '{}' is less \
             than zero. Raw motor speeds must be non-negative numbers.",
            motor.name
        )));
    }
    if motor.raw_maximum_speed > 0.0 && raw_base_speed > motor.raw_maximum_speed {
        return Err(MotorError::WouldExceedLimit(format!(
            "Requested raw base speed {raw_base_speed} for motor '{}' is \
             greater than the raw maximum speed of {}.",
            motor.name, motor.raw_maximum_speed
        )));
    }
    if raw_base_speed > motor.raw_speed {
        return Err(MotorError::WouldExceedLimit(format!(
            "Requested raw base speed {raw_base_speed} for motor '{}' is \
             greater than the current raw speed of {}.",
            motor.name, motor.raw_speed
        )));
    }
    Ok(())
}
