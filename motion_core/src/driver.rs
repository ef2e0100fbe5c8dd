//! Motor capability trait.
//!
//! This module defines:
//! - `MotorDriver` trait - optional capability slots of a concrete driver
//! - `Parameter` enum - parameters moved through `get_parameter`/`set_parameter`
//! - `SimultaneousMove` - one participant of a simultaneous start
//!
//! Every slot returns `Option<MotorResult<_>>`. `None` means the driver
//! does not provide the capability; the motor core then walks its
//! fallback chain. `Some(Err(_))` is a real failure and is propagated,
//! never treated as absence.
//!
//! # Fallback Chains
//!
//! | Operation      | Order                                                             |
//! |----------------|-------------------------------------------------------------------|
//! | status         | `get_status`, `get_extended_status`, busy + limit slots, idle      |
//! | busy           | `motor_is_busy`, status chain                                     |
//! | position       | `get_position`, `get_extended_status`, Unsupported                |
//! | limit hit      | own slot, `get_status`, `get_extended_status`, false              |
//! | soft abort     | `soft_abort`, `immediate_abort`, warn and succeed                 |
//! | immediate abort| `immediate_abort`, `soft_abort`, warn and succeed                 |

use crate::state::MotorState;
use motion_common::error::MotorResult;
use motion_common::units::Raw;

/// Parameters exchanged through the parameter slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Speed,
    BaseSpeed,
    MaximumSpeed,
    AccelerationType,
    RawAccelerationParameters,
    ProportionalGain,
    IntegralGain,
    DerivativeGain,
    VelocityFeedforwardGain,
    AccelerationFeedforwardGain,
    IntegralLimit,
    ExtraGain,
    AxisEnable,
    ClosedLoop,
    FaultReset,
    HomeSwitch,
    SaveStartPositions,
    UseStartPositions,
    SynchronousMotionMode,
}

/// One motor taking part in a simultaneous start.
#[derive(Debug, Clone, PartialEq)]
pub struct SimultaneousMove {
    pub motor: String,
    pub raw_destination: Raw,
}

/// Capability slots of a concrete motor driver.
///
/// Slots read the inputs they need from the [`MotorState`] and update the
/// fields they own before returning:
///
/// | Slot                      | Reads                         | Writes                         |
/// |---------------------------|-------------------------------|--------------------------------|
/// | `move_absolute`           | `raw_destination`             | -                              |
/// | `get_position`            | -                             | `raw_position`                 |
/// | `set_position`            | `raw_set_position`            | `raw_position`                 |
/// | `get_status`              | -                             | `status`                       |
/// | `get_extended_status`     | -                             | `raw_position`, `status`       |
/// | `motor_is_busy`           | -                             | `busy`                         |
/// | `positive_limit_hit`      | -                             | `positive_limit_hit`           |
/// | `negative_limit_hit`      | -                             | `negative_limit_hit`           |
/// | `raw_home_command`        | `home_search_direction`       | -                              |
/// | `constant_velocity_move`  | `constant_velocity_direction` | -                              |
/// | `get_parameter`           | -                             | the parameter's fields         |
/// | `set_parameter`           | the parameter's fields        | -                              |
pub trait MotorDriver: Send {
    /// Returns the driver's identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    fn move_absolute(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn get_position(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn set_position(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn get_status(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn get_extended_status(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn motor_is_busy(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn soft_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn immediate_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn positive_limit_hit(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn negative_limit_hit(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn get_parameter(
        &mut self,
        _motor: &mut MotorState,
        _parameter: Parameter,
    ) -> Option<MotorResult<()>> {
        None
    }

    fn set_parameter(
        &mut self,
        _motor: &mut MotorState,
        _parameter: Parameter,
    ) -> Option<MotorResult<()>> {
        None
    }

    fn raw_home_command(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    fn constant_velocity_move(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        None
    }

    /// Starts every listed motor in one call. Invoked on the first
    /// participant's driver.
    fn simultaneous_start(&mut self, _moves: &[SimultaneousMove]) -> Option<MotorResult<()>> {
        None
    }

    /// Driver-defined home search.
    fn special_home_search(
        &mut self,
        _motor: &mut MotorState,
        _direction: i32,
    ) -> Option<MotorResult<()>> {
        None
    }

    /// Maps a position of this (pseudo)motor to its real motor's position.
    fn pseudomotor_to_real(&self, _motor: &MotorState, _position: f64) -> Option<MotorResult<f64>> {
        None
    }

    /// Maps a real motor position to this (pseudo)motor's position.
    fn real_to_pseudomotor(&self, _motor: &MotorState, _position: f64) -> Option<MotorResult<f64>> {
        None
    }
}
