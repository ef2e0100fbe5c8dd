//! Position reads, redefinition, start positions and layer transforms.

use super::{Motor, required};
use crate::driver::Parameter;
use motion_common::error::{MotorError, MotorResult};
use motion_common::units::Raw;

impl Motor {
    /// Reads the current engineering position.
    ///
    /// Uses `get_position`, falling back to `get_extended_status`.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if the driver has neither slot.
    pub fn get_position(&mut self) -> MotorResult<f64> {
        self.read_raw_position()?;
        Ok(self.state.position)
    }

    /// Reads the current raw position.
    pub fn get_raw_position(&mut self) -> MotorResult<Raw> {
        self.read_raw_position()?;
        Ok(self.state.raw_position)
    }

    fn read_raw_position(&mut self) -> MotorResult<()> {
        if let Some(result) = self.driver.get_position(&mut self.state) {
            result?;
        } else if let Some(result) = self.driver.get_extended_status(&mut self.state) {
            result?;
        } else {
            return Err(MotorError::unsupported(&self.state.name, "get_position"));
        }
        self.state.refresh_position();
        Ok(())
    }

    /// Redefines the current position as `position` without moving.
    ///
    /// The destination follows, so a subsequent `steps_to_go` is zero.
    pub fn set_position(&mut self, position: f64) -> MotorResult<()> {
        let raw = self.state.to_raw(position);
        self.state.raw_set_position = raw;
        self.state.set_position = self.state.scaling.to_engineering(raw);

        let name = self.state.name.clone();
        required(self.driver.set_position(&mut self.state), &name, "set_position")?;

        self.state.refresh_position();
        self.state.raw_destination = self.state.raw_position;
        self.state.destination = self.state.position;
        Ok(())
    }

    /// Makes the current position read as zero.
    pub fn zero_position_value(&mut self) -> MotorResult<()> {
        self.set_position(0.0)
    }

    /// Raw distance left to the destination.
    pub fn steps_to_go(&mut self) -> MotorResult<Raw> {
        self.read_raw_position()?;
        Ok(self.state.raw_destination.delta(self.state.raw_position))
    }

    // ─── Start Positions ────────────────────────────────────────────

    /// Hands a scan start position to the controller. A no-op for drivers
    /// without `set_parameter`.
    pub fn save_start_positions(&mut self, start: f64) -> MotorResult<()> {
        self.state.raw_saved_start_position = self.state.to_raw(start).as_f64();
        self.set_parameter_optional(Parameter::SaveStartPositions)
    }

    /// Asks the controller to start the next move from the saved start
    /// position. A no-op for drivers without `set_parameter`.
    pub fn use_start_positions(&mut self) -> MotorResult<()> {
        self.state.use_start_positions = true;
        self.set_parameter_optional(Parameter::UseStartPositions)
    }

    // ─── Layer Transforms ───────────────────────────────────────────

    /// Maps `position` one layer down, to this motor's real motor.
    ///
    /// Chains are walked by [`MotorRegistry`](crate::registry::MotorRegistry).
    pub fn transform_to_real(&self, position: f64) -> MotorResult<f64> {
        self.driver
            .pseudomotor_to_real(&self.state, position)
            .unwrap_or_else(|| {
                Err(MotorError::Unsupported(format!(
                    "Computing a real motor position from a pseudomotor position \
                     is not supported by the driver for motor '{}'.",
                    self.state.name
                )))
            })
    }

    /// Maps a real motor `position` one layer up, to this motor.
    pub fn transform_from_real(&self, position: f64) -> MotorResult<f64> {
        self.driver
            .real_to_pseudomotor(&self.state, position)
            .unwrap_or_else(|| {
                Err(MotorError::Unsupported(format!(
                    "Computing a pseudomotor position from a real position \
                     is not supported by the driver for motor '{}'.",
                    self.state.name
                )))
            })
    }
}
