//! Linear pseudomotor.
//!
//! `pseudo = gain * real + offset`. The transforms are what a
//! [`MotorRegistry`](motion_core::registry::MotorRegistry) chain walk
//! folds over. When attached to a simulated axis the pseudomotor also
//! moves, reads and stops that axis through the same mapping.

use crate::controller::SimController;
use motion_common::error::{MotorError, MotorResult};
use motion_common::units::{ANALOG_FUZZ, Raw};
use motion_core::driver::MotorDriver;
use motion_core::state::MotorState;

#[derive(Debug, Clone)]
pub struct LinearPseudomotor {
    gain: f64,
    offset: f64,
    axis: Option<(SimController, usize)>,
}

impl LinearPseudomotor {
    /// Transform-only pseudomotor.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` for a zero or non-finite gain.
    pub fn new(gain: f64, offset: f64) -> MotorResult<Self> {
        if !gain.is_finite() || gain.abs() < ANALOG_FUZZ {
            return Err(MotorError::IllegalArgument(format!(
                "A linear pseudomotor needs a finite non-zero gain, got {gain}."
            )));
        }
        Ok(Self {
            gain,
            offset,
            axis: None,
        })
    }

    /// Drives the simulated axis called `axis` through the mapping.
    pub fn attached(mut self, controller: &SimController, axis: &str) -> MotorResult<Self> {
        self.axis = Some((controller.clone(), controller.axis_index(axis)?));
        Ok(self)
    }

    pub fn to_real(&self, position: f64) -> f64 {
        (position - self.offset) / self.gain
    }

    pub fn from_real(&self, position: f64) -> f64 {
        self.gain * position + self.offset
    }
}

impl MotorDriver for LinearPseudomotor {
    fn name(&self) -> &'static str {
        "linear_pseudomotor"
    }

    fn move_absolute(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let (controller, index) = self.axis.as_ref()?;
        let target = self.to_real(motor.raw_destination.as_f64());
        Some(controller.with_axis(*index, |axis, now| axis.start_move(target, now)))
    }

    fn get_position(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let (controller, index) = self.axis.as_ref()?;
        let real = controller.with_axis(*index, |axis, _| Ok(axis.position()));
        Some(real.map(|real| {
            motor.raw_position = Raw::from_f64(motor.subclass, self.from_real(real));
        }))
    }

    fn get_status(&mut self, motor: &mut MotorState) -> Option<MotorResult<()>> {
        let (controller, index) = self.axis.as_ref()?;
        Some(controller.with_axis(*index, |axis, _| {
            motor.status = axis.status();
            Ok(())
        }))
    }

    fn soft_abort(&mut self, _motor: &mut MotorState) -> Option<MotorResult<()>> {
        let (controller, index) = self.axis.as_ref()?;
        Some(controller.with_axis(*index, |axis, now| {
            axis.stop(now);
            Ok(())
        }))
    }

    fn pseudomotor_to_real(&self, _motor: &MotorState, position: f64) -> Option<MotorResult<f64>> {
        Some(Ok(self.to_real(position)))
    }

    fn real_to_pseudomotor(&self, _motor: &MotorState, position: f64) -> Option<MotorResult<f64>> {
        Some(Ok(self.from_real(position)))
    }
}
