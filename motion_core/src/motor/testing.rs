//! In-memory driver for unit tests.
//!
//! Moves complete instantly; the axis reports BUSY for a configurable
//! number of status reads afterwards. Slots can be made absent or made
//! to fail by name.

use crate::driver::{MotorDriver, Parameter, SimultaneousMove};
use crate::motor::Motor;
use crate::parameter::{default_get_parameter, default_set_parameter};
use crate::state::MotorState;
use motion_common::clock::ManualClock;
use motion_common::config::MotionSettings;
use motion_common::context::MotionContext;
use motion_common::error::{MotorError, MotorResult};
use motion_common::interrupt::{InterruptPoller, NoInterrupts};
use motion_common::motor::MotorConfig;
use motion_common::status::MotorStatus;
use motion_common::units::{MotorSubclass, Raw};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub(crate) struct FakeAxis {
    pub raw_position: f64,
    pub status: MotorStatus,
    /// Status reads that report BUSY after each move.
    pub busy_polls: u32,
    pub busy_remaining: u32,
    pub raw_speed: f64,
    pub raw_acceleration_parameters: [f64; 4],
    /// Raw destinations commanded, in order.
    pub visited: Vec<f64>,
    pub calls: Vec<String>,
    pub absent: HashSet<&'static str>,
    pub failing: HashSet<&'static str>,
    /// Fixed speed the axis reports regardless of writes, if set.
    pub stuck_speed: Option<f64>,
}

#[derive(Clone)]
pub(crate) struct FakeDriver {
    pub axis: Arc<Mutex<FakeAxis>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            axis: Arc::new(Mutex::new(FakeAxis::default())),
        }
    }

    pub fn axis(&self) -> MutexGuard<'_, FakeAxis> {
        self.axis.lock().unwrap()
    }

    fn slot<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut FakeAxis) -> MotorResult<T>,
    ) -> Option<MotorResult<T>> {
        let mut axis = self.axis.lock().unwrap();
        if axis.absent.contains(name) {
            return None;
        }
        axis.calls.push(name.to_string());
        if axis.failing.contains(name) {
            return Some(Err(MotorError::DeviceIo(format!("{name} failed"))));
        }
        Some(op(&mut axis))
    }
}

fn current_status(axis: &mut FakeAxis) -> MotorStatus {
    let mut status = axis.status;
    if axis.busy_remaining > 0 {
        axis.busy_remaining -= 1;
        status |= MotorStatus::BUSY;
    }
    status
}

impl MotorDriver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn move_absolute(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let target = motor.raw_destination.as_f64();
        self.slot("move_absolute", |axis| {
            axis.visited.push(target);
            axis.raw_position = target;
            axis.busy_remaining = axis.busy_polls;
            Ok(())
        })
    }

    fn get_position(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let subclass = motor.subclass;
        self.slot("get_position", |axis| {
            motor.raw_position = Raw::from_f64(subclass, axis.raw_position);
            Ok(())
        })
    }

    fn set_position(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let value = motor.raw_set_position;
        self.slot("set_position", |axis| {
            axis.raw_position = value.as_f64();
            motor.raw_position = value;
            Ok(())
        })
    }

    fn get_status(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot("get_status", |axis| {
            motor.status = current_status(axis);
            Ok(())
        })
    }

    fn get_extended_status(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let subclass = motor.subclass;
        self.slot("get_extended_status", |axis| {
            motor.status = current_status(axis);
            motor.raw_position = Raw::from_f64(subclass, axis.raw_position);
            Ok(())
        })
    }

    fn motor_is_busy(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot("motor_is_busy", |axis| {
            motor.busy = current_status(axis).is_busy();
            Ok(())
        })
    }

    fn soft_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot("soft_abort", |axis| {
            axis.busy_remaining = 0;
            Ok(())
        })
    }

    fn immediate_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot("immediate_abort", |axis| {
            axis.busy_remaining = 0;
            Ok(())
        })
    }

    fn positive_limit_hit(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot("positive_limit_hit", |axis| {
            motor.positive_limit_hit = axis.status.contains(MotorStatus::POSITIVE_LIMIT_HIT);
            Ok(())
        })
    }

    fn negative_limit_hit(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        self.slot("negative_limit_hit", |axis| {
            motor.negative_limit_hit = axis.status.contains(MotorStatus::NEGATIVE_LIMIT_HIT);
            Ok(())
        })
    }

    fn get_parameter(
        &mut self,
        motor: &mut MotorState,
        parameter: Parameter,
    ) -> Option<MotorResult<()>> {
        self.slot("get_parameter", |axis| match parameter {
            Parameter::Speed => {
                motor.raw_speed = axis.stuck_speed.unwrap_or(axis.raw_speed);
                Ok(())
            }
            Parameter::RawAccelerationParameters => {
                motor.raw_acceleration_parameters = axis.raw_acceleration_parameters;
                Ok(())
            }
            other => default_get_parameter(motor, other),
        })
    }

    fn set_parameter(
        &mut self,
        motor: &mut MotorState,
        parameter: Parameter,
    ) -> Option<MotorResult<()>> {
        self.slot("set_parameter", |axis| {
            default_set_parameter(motor, parameter)?;
            match parameter {
                Parameter::Speed => axis.raw_speed = motor.raw_speed,
                Parameter::RawAccelerationParameters => {
                    axis.raw_acceleration_parameters = motor.raw_acceleration_parameters
                }
                _ => {}
            }
            Ok(())
        })
    }

    fn raw_home_command(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let direction = motor.home_search_direction;
        self.slot("raw_home_command", |axis| {
            axis.calls.push(format!("home {direction}"));
            axis.raw_position = 0.0;
            axis.busy_remaining = axis.busy_polls;
            Ok(())
        })
    }

    fn constant_velocity_move(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let direction = motor.constant_velocity_direction;
        self.slot("constant_velocity_move", |axis| {
            axis.calls.push(format!("cv {direction}"));
            axis.busy_remaining = axis.busy_polls;
            Ok(())
        })
    }

    fn simultaneous_start(&mut self, moves: &[SimultaneousMove]) -> Option<MotorResult<()>> {
        let count = moves.len();
        self.slot("simultaneous_start", |axis| {
            axis.calls.push(format!("start {count}"));
            Ok(())
        })
    }
}

pub(crate) fn manual_context() -> (Arc<MotionContext>, Arc<ManualClock>) {
    context_with(Box::new(NoInterrupts))
}

pub(crate) fn context_with(
    interrupts: Box<dyn InterruptPoller>,
) -> (Arc<MotionContext>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let ctx = Arc::new(MotionContext::new(
        MotionSettings::default(),
        clock.clone(),
        interrupts,
    ));
    (ctx, clock)
}

/// Stepper motor with scale 1, limits ±1000 and the given backlash.
pub(crate) fn stepper(backlash: f64) -> (Motor, FakeDriver, Arc<ManualClock>) {
    let mut config = MotorConfig::new("m", MotorSubclass::Stepper);
    config.raw_positive_limit = 1000.0;
    config.raw_negative_limit = -1000.0;
    config.raw_backlash_correction = backlash;
    build(&config)
}

pub(crate) fn build(config: &MotorConfig) -> (Motor, FakeDriver, Arc<ManualClock>) {
    let driver = FakeDriver::new();
    let (ctx, clock) = manual_context();
    let motor = Motor::new(config, Box::new(driver.clone()), ctx).unwrap();
    (motor, driver, clock)
}
