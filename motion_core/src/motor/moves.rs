//! Absolute and relative moves with backlash, plus direct motion commands.
//!
//! # Move Algorithm
//!
//! Shared by steppers and analog motors, working on raw values:
//!
//! 1. Skip the move if the relative motion is smaller than the deadband.
//! 2. If the backlash correction has the same sign as the motion, move to
//!    `target + backlash` first and wait for it to settle. A failure here is
//!    returned as-is, the motor is not aborted.
//! 3. Stop there if only the backlash position was requested.
//! 4. Check the target against the software limits. Stop there if only a
//!    limit check was requested.
//! 5. Commit the destination and start the move.
//! 6. Refresh the cached position unless `NOWAIT` was requested.
//!
//! The main move is started, not awaited. Use
//! [`Motor::wait_for_motor_stop`] to wait for it.

use super::limits::{LimitCheck, check_raw_limits};
use super::{Motor, required};
use crate::driver::{Parameter, SimultaneousMove};
use motion_common::error::{MotorError, MotorResult};
use motion_common::status::MoveFlags;
use motion_common::units::Raw;
use tracing::debug;

/// How far a move request got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Relative motion below the deadband, nothing was commanded.
    WithinDeadband,
    /// `ONLY_CHECK_LIMITS`: limits passed, nothing was commanded.
    LimitsChecked,
    /// `GO_TO_BACKLASH_POSITION`: stopped after the backlash pre-move.
    BacklashPositionReached,
    /// The move to the target was started.
    Started,
}

/// Direct axis commands sent through `set_parameter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    AxisEnable,
    ClosedLoop,
    FaultReset,
}

/// Whether a backlash pre-move applies to `relative` motion.
pub(crate) fn backlash_applies(relative: Raw, backlash: Raw) -> bool {
    let direction = relative.signum();
    direction != 0 && direction == backlash.signum()
}

/// Normalizes a user direction to ±1 and flips it for a negative scale.
pub(crate) fn raw_direction(direction: i32, scale: f64) -> i32 {
    let direction = if direction >= 0 { 1 } else { -1 };
    if scale < 0.0 { -direction } else { direction }
}

impl Motor {
    /// Moves to an engineering position. See the module docs.
    pub fn move_absolute(&mut self, position: f64, flags: MoveFlags) -> MotorResult<()> {
        self.move_absolute_with_report(position, flags).map(|_| ())
    }

    /// Like [`move_absolute`](Self::move_absolute), reporting how far the
    /// request got.
    pub fn move_absolute_with_report(
        &mut self,
        position: f64,
        flags: MoveFlags,
    ) -> MotorResult<MoveOutcome> {
        let target = self.state.to_raw(position);
        debug!(motor = %self.state.name, position, raw = %target, ?flags, "Move absolute");
        self.move_to_raw(target, flags)
    }

    /// Moves by `delta` engineering units from the current position.
    pub fn move_relative(&mut self, delta: f64, flags: MoveFlags) -> MotorResult<()> {
        let current = self.get_position()?;
        self.move_absolute(current + delta, flags)
    }

    pub(crate) fn move_to_raw(&mut self, target: Raw, flags: MoveFlags) -> MotorResult<MoveOutcome> {
        self.get_position()?;
        let relative = target.delta(self.state.raw_position);

        if relative.abs().as_f64() < self.state.raw_move_deadband.as_f64() {
            debug!(motor = %self.state.name, %relative, "Move within deadband skipped");
            return Ok(MoveOutcome::WithinDeadband);
        }

        if !flags.intersects(MoveFlags::GO_TO_BACKLASH_POSITION | MoveFlags::ONLY_CHECK_LIMITS) {
            self.state.old_destination = self.state.destination;
        }

        let backlash = self.state.raw_backlash_correction;
        if !flags.contains(MoveFlags::IGNORE_BACKLASH) && backlash_applies(relative, backlash) {
            let backlash_position = target.offset_by(backlash);
            check_raw_limits(&self.state, backlash_position, LimitCheck::Backlash)?;

            if !flags.contains(MoveFlags::ONLY_CHECK_LIMITS) {
                self.state.backlash_move_in_progress = true;
                if let Err(e) = self.start_raw_move(backlash_position) {
                    self.state.backlash_move_in_progress = false;
                    return Err(e);
                }

                if flags.contains(MoveFlags::NOWAIT | MoveFlags::GO_TO_BACKLASH_POSITION) {
                    return Ok(MoveOutcome::BacklashPositionReached);
                }

                let settled = self.wait_for_motor_stop(flags);
                self.state.backlash_move_in_progress = false;
                settled?;
                self.get_position()?;
            }
        }

        if flags.contains(MoveFlags::GO_TO_BACKLASH_POSITION) {
            return Ok(MoveOutcome::BacklashPositionReached);
        }

        check_raw_limits(&self.state, target, LimitCheck::Move)?;

        if flags.contains(MoveFlags::ONLY_CHECK_LIMITS) {
            return Ok(MoveOutcome::LimitsChecked);
        }

        self.start_raw_move(target)?;

        if !flags.contains(MoveFlags::NOWAIT) {
            self.get_position()?;
        }
        Ok(MoveOutcome::Started)
    }

    /// Commits `raw` as the destination and calls the driver, bypassing
    /// backlash and limit checks.
    pub(crate) fn start_raw_move(&mut self, raw: Raw) -> MotorResult<()> {
        self.commit_destination(raw);
        let name = self.state.name.clone();
        required(self.driver.move_absolute(&mut self.state), &name, "move_absolute")
    }

    /// Records `raw` as the destination of a command being issued.
    pub(crate) fn commit_destination(&mut self, raw: Raw) {
        self.state.raw_destination = raw;
        self.state.destination = self.state.scaling.to_engineering(raw);
        self.begin_command();
    }

    /// Backlash pre-move position for a move to `target`, if one applies.
    ///
    /// # Errors
    ///
    /// Returns `WouldExceedLimit` if the backlash position lies outside the
    /// software limits.
    pub(crate) fn backlash_target(&mut self, target: Raw) -> MotorResult<Option<Raw>> {
        self.get_position()?;
        let relative = target.delta(self.state.raw_position);
        let backlash = self.state.raw_backlash_correction;
        if !backlash_applies(relative, backlash) {
            return Ok(None);
        }
        let position = target.offset_by(backlash);
        check_raw_limits(&self.state, position, LimitCheck::Backlash)?;
        Ok(Some(position))
    }

    pub(crate) fn set_backlash_move_in_progress(&mut self, in_progress: bool) {
        self.state.backlash_move_in_progress = in_progress;
    }

    /// Starts every move in `moves` through this motor's driver.
    pub(crate) fn simultaneous_start(&mut self, moves: &[SimultaneousMove]) -> MotorResult<()> {
        self.driver.simultaneous_start(moves).unwrap_or_else(|| {
            Err(MotorError::Unsupported(format!(
                "The '{}' driver for motor '{}' does not support simultaneous starts.",
                self.driver.name(),
                self.state.name
            )))
        })
    }

    /// Records a move started on this motor's behalf by another driver.
    pub(crate) fn record_simultaneous_start(&mut self, raw: Raw, primary: bool) {
        if primary {
            self.state.old_destination = self.state.destination;
        }
        self.commit_destination(raw);
    }

    // ─── Direct Commands ────────────────────────────────────────────

    /// Starts an unbounded move in `direction` (sign only).
    pub fn constant_velocity_move(&mut self, direction: i32) -> MotorResult<()> {
        self.state.constant_velocity_direction = raw_direction(direction, self.state.scaling.scale);
        self.begin_command();
        let name = self.state.name.clone();
        required(
            self.driver.constant_velocity_move(&mut self.state),
            &name,
            "constant_velocity_move",
        )
    }

    /// Runs the driver's own home command in `direction` (sign only).
    pub fn find_home_position(&mut self, direction: i32) -> MotorResult<()> {
        self.state.home_search_direction = raw_direction(direction, self.state.scaling.scale);
        self.begin_command();
        self.state.home_search_in_progress = true;
        let name = self.state.name.clone();
        let result = required(
            self.driver.raw_home_command(&mut self.state),
            &name,
            "raw_home_command",
        );
        if result.is_err() {
            self.state.home_search_in_progress = false;
        }
        result
    }

    /// Sends an axis enable, closed loop or fault reset command.
    pub fn send_control_command(&mut self, command: ControlCommand, value: bool) -> MotorResult<()> {
        let parameter = match command {
            ControlCommand::AxisEnable => {
                self.state.axis_enable = value;
                Parameter::AxisEnable
            }
            ControlCommand::ClosedLoop => {
                self.state.closed_loop = value;
                Parameter::ClosedLoop
            }
            ControlCommand::FaultReset => {
                self.state.fault_reset = value;
                Parameter::FaultReset
            }
        };
        self.set_parameter_required(parameter, "send_control_command")
    }
}
