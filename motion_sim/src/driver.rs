//! Motor driver over a simulated axis.
//!
//! [`SimMotorDriver`] implements every [`MotorDriver`] slot except the
//! pseudomotor transforms. Slots can be masked with [`Capabilities`] so
//! the motor core's fallback chains run against a live axis.

use crate::axis::SimAxis;
use crate::controller::SimController;
use bitflags::bitflags;
use motion_common::clock::Tick;
use motion_common::error::MotorResult;
use motion_common::motor::HomeSwitch;
use motion_common::status::MotorStatus;
use motion_common::units::Raw;
use motion_core::driver::{MotorDriver, Parameter, SimultaneousMove};
use motion_core::parameter::{default_get_parameter, default_set_parameter};
use motion_core::state::MotorState;

bitflags! {
    /// Driver slots a [`SimMotorDriver`] exposes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const MOVE_ABSOLUTE          = 1 << 0;
        const GET_POSITION           = 1 << 1;
        const SET_POSITION           = 1 << 2;
        const GET_STATUS             = 1 << 3;
        const GET_EXTENDED_STATUS    = 1 << 4;
        const MOTOR_IS_BUSY          = 1 << 5;
        const SOFT_ABORT             = 1 << 6;
        const IMMEDIATE_ABORT        = 1 << 7;
        const POSITIVE_LIMIT_HIT     = 1 << 8;
        const NEGATIVE_LIMIT_HIT     = 1 << 9;
        const GET_PARAMETER          = 1 << 10;
        const SET_PARAMETER          = 1 << 11;
        const RAW_HOME_COMMAND       = 1 << 12;
        const CONSTANT_VELOCITY_MOVE = 1 << 13;
        const SIMULTANEOUS_START     = 1 << 14;
        const SPECIAL_HOME_SEARCH    = 1 << 15;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Driver bound to one axis of a [`SimController`].
#[derive(Debug, Clone)]
pub struct SimMotorDriver {
    controller: SimController,
    axis: usize,
    capabilities: Capabilities,
}

impl SimMotorDriver {
    /// Driver for the axis called `axis`, with every capability.
    pub fn new(controller: &SimController, axis: &str) -> MotorResult<Self> {
        Ok(Self {
            axis: controller.axis_index(axis)?,
            controller: controller.clone(),
            capabilities: Capabilities::all(),
        })
    }

    /// Hides the slots in `masked`.
    pub fn without(mut self, masked: Capabilities) -> Self {
        self.capabilities -= masked;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn slot<T>(
        &self,
        capability: Capabilities,
        name: &'static str,
        op: impl FnOnce(&mut SimAxis, Tick) -> MotorResult<T>,
    ) -> Option<MotorResult<T>> {
        if !self.capabilities.contains(capability) {
            return None;
        }
        Some(self.controller.with_axis(self.axis, |axis, now| {
            axis.check_slot(name)?;
            op(axis, now)
        }))
    }
}

impl MotorDriver for SimMotorDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn move_absolute(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let target = motor.raw_destination.as_f64();
        self.slot(Capabilities::MOVE_ABSOLUTE, "move_absolute", |axis, now| {
            axis.start_move(target, now)
        })
    }

    fn get_position(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(Capabilities::GET_POSITION, "get_position", |axis, _| {
            motor.raw_position = Raw::from_f64(motor.subclass, axis.position());
            Ok(())
        })
    }

    fn set_position(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(Capabilities::SET_POSITION, "set_position", |axis, _| {
            axis.set_position(motor.raw_set_position.as_f64());
            motor.raw_position = Raw::from_f64(motor.subclass, axis.position());
            Ok(())
        })
    }

    fn get_status(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(Capabilities::GET_STATUS, "get_status", |axis, _| {
            motor.status = axis.status();
            Ok(())
        })
    }

    fn get_extended_status(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(
            Capabilities::GET_EXTENDED_STATUS,
            "get_extended_status",
            |axis, _| {
                motor.status = axis.status();
                motor.raw_position = Raw::from_f64(motor.subclass, axis.position());
                Ok(())
            },
        )
    }

    fn motor_is_busy(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(Capabilities::MOTOR_IS_BUSY, "motor_is_busy", |axis, _| {
            motor.busy = axis.status().is_busy();
            Ok(())
        })
    }

    fn soft_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(Capabilities::SOFT_ABORT, "soft_abort", |axis, now| {
            axis.stop(now);
            Ok(())
        })
    }

    fn immediate_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(Capabilities::IMMEDIATE_ABORT, "immediate_abort", |axis, now| {
            axis.stop(now);
            Ok(())
        })
    }

    fn positive_limit_hit(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(
            Capabilities::POSITIVE_LIMIT_HIT,
            "positive_limit_hit",
            |axis, _| {
                motor.positive_limit_hit = axis.status().contains(MotorStatus::POSITIVE_LIMIT_HIT);
                Ok(())
            },
        )
    }

    fn negative_limit_hit(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot(
            Capabilities::NEGATIVE_LIMIT_HIT,
            "negative_limit_hit",
            |axis, _| {
                motor.negative_limit_hit = axis.status().contains(MotorStatus::NEGATIVE_LIMIT_HIT);
                Ok(())
            },
        )
    }

    fn get_parameter(
        &mut self,
        motor: &mut MotorState,
        parameter: Parameter,
    ) -> Option<MotorResult<()>> {
        self.slot(Capabilities::GET_PARAMETER, "get_parameter", |axis, _| {
            match parameter {
                Parameter::Speed => motor.raw_speed = axis.speed(),
                Parameter::MaximumSpeed => motor.raw_maximum_speed = axis.maximum_speed(),
                Parameter::RawAccelerationParameters => {
                    motor.raw_acceleration_parameters = axis.acceleration_parameters()
                }
                Parameter::HomeSwitch => motor.home_switch = axis.home_switch(),
                Parameter::AxisEnable => motor.axis_enable = axis.is_enabled(),
                Parameter::ClosedLoop => motor.closed_loop = axis.is_closed_loop(),
                Parameter::SynchronousMotionMode => {
                    motor.synchronous_motion_mode = axis.synchronous_motion_mode()
                }
                other => return default_get_parameter(motor, other),
            }
            Ok(())
        })
    }

    fn set_parameter(
        &mut self,
        motor: &mut MotorState,
        parameter: Parameter,
    ) -> Option<MotorResult<()>> {
        self.slot(Capabilities::SET_PARAMETER, "set_parameter", |axis, now| {
            default_set_parameter(motor, parameter)?;
            match parameter {
                Parameter::Speed => axis.set_speed(motor.raw_speed, now),
                Parameter::RawAccelerationParameters => {
                    axis.set_acceleration_parameters(motor.raw_acceleration_parameters)
                }
                Parameter::HomeSwitch => axis.set_home_switch(motor.home_switch),
                Parameter::AxisEnable => axis.set_enabled(motor.axis_enable, now),
                Parameter::ClosedLoop => axis.set_closed_loop(motor.closed_loop),
                Parameter::FaultReset if motor.fault_reset => axis.clear_faults(),
                Parameter::SynchronousMotionMode => {
                    axis.set_synchronous_motion_mode(motor.synchronous_motion_mode)
                }
                _ => {}
            }
            Ok(())
        })
    }

    fn raw_home_command(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let direction = motor.home_search_direction;
        self.slot(Capabilities::RAW_HOME_COMMAND, "raw_home_command", |axis, now| {
            let switch = axis.home_switch();
            axis.start_home_search(direction, switch, now)
        })
    }

    fn constant_velocity_move(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let direction = motor.constant_velocity_direction;
        self.slot(
            Capabilities::CONSTANT_VELOCITY_MOVE,
            "constant_velocity_move",
            |axis, now| axis.start_jog(direction, now),
        )
    }

    fn simultaneous_start(&mut self, moves: &[SimultaneousMove]) -> Option<MotorResult<()>> {
        if !self.capabilities.contains(Capabilities::SIMULTANEOUS_START) {
            return None;
        }
        let checked = self
            .controller
            .with_axis(self.axis, |axis, _| axis.check_slot("simultaneous_start"));
        Some(checked.and_then(|()| self.controller.simultaneous_start(moves)))
    }

    /// Searches for the home input whatever switch is bound.
    fn special_home_search(
        &mut self,
        _motor: &mut MotorState,
        direction: i32,
    ) -> Option<MotorResult<()>> {
        self.slot(
            Capabilities::SPECIAL_HOME_SEARCH,
            "special_home_search",
            |axis, now| axis.start_home_search(direction, HomeSwitch::HomeInput, now),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimAxisConfig;
    use motion_common::clock::ManualClock;
    use motion_common::error::ErrorKind;
    use motion_common::motor::MotorConfig;
    use motion_common::units::MotorSubclass;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (SimMotorDriver, SimController, Arc<ManualClock>, MotorState) {
        let clock = Arc::new(ManualClock::new());
        let controller = SimController::new(clock.clone());
        controller
            .add_axis(SimAxisConfig::new("x").with_limit_switches(-50.0, 50.0))
            .unwrap();
        let driver = SimMotorDriver::new(&controller, "x").unwrap();
        let state = MotorState::from_config(&MotorConfig::new("x", MotorSubclass::Analog));
        (driver, controller, clock, state)
    }

    #[test]
    fn test_move_and_read_back() {
        let (mut driver, _, clock, mut state) = setup();
        state.raw_destination = Raw::Analog(4.0);
        driver.move_absolute(&mut state).unwrap().unwrap();
        clock.advance(Duration::from_millis(200));
        driver.get_extended_status(&mut state).unwrap().unwrap();
        assert!((state.raw_position.as_f64() - 2.0).abs() < 1e-9);
        assert!(state.status.is_busy());
    }

    #[test]
    fn test_masked_slots_are_absent() {
        let (driver, ..) = setup();
        let mut driver = driver.without(Capabilities::GET_STATUS | Capabilities::SOFT_ABORT);
        let mut state = MotorState::from_config(&MotorConfig::new("x", MotorSubclass::Analog));
        assert!(driver.get_status(&mut state).is_none());
        assert!(driver.soft_abort(&mut state).is_none());
        assert!(driver.immediate_abort(&mut state).is_some());
        assert!(!driver.capabilities().contains(Capabilities::GET_STATUS));
    }

    #[test]
    fn test_injected_slot_failure() {
        let (mut driver, controller, _, mut state) = setup();
        controller.fail_next("x", "get_position").unwrap();
        let err = driver.get_position(&mut state).unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceIo);
        assert!(driver.get_position(&mut state).unwrap().is_ok());
    }

    #[test]
    fn test_speed_parameter_reaches_axis() {
        let (mut driver, controller, _, mut state) = setup();
        state.raw_speed = 25.0;
        driver.set_parameter(&mut state, Parameter::Speed).unwrap().unwrap();
        state.raw_speed = 0.0;
        driver.get_parameter(&mut state, Parameter::Speed).unwrap().unwrap();
        assert_eq!(state.raw_speed, 25.0);
        let speed = controller.with_named("x", |axis, _| Ok(axis.speed())).unwrap();
        assert_eq!(speed, 25.0);
    }

    #[test]
    fn test_fault_reset_clears_faults() {
        let (mut driver, controller, _, mut state) = setup();
        controller.inject_fault("x", MotorStatus::DRIVE_FAULT).unwrap();
        state.fault_reset = true;
        driver.set_parameter(&mut state, Parameter::FaultReset).unwrap().unwrap();
        assert!(controller.status("x").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_axis() {
        let clock = Arc::new(ManualClock::new());
        let controller = SimController::new(clock);
        let err = SimMotorDriver::new(&controller, "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgument);
    }
}
