//! Home-search strategies.
//!
//! | Strategy                           | Limit move        | Push off | Home command           |
//! |------------------------------------|-------------------|----------|------------------------|
//! | `RawHomeCommand`                   | -                 | -        | driver                 |
//! | `SameDirLimitThenRawHome`          | home direction    | yes      | driver                 |
//! | `OppositeDirLimitThenRawHome`      | opposite          | -        | driver                 |
//! | `LimitSwitchAsHomeSwitch`          | -                 | -        | driver, limit as home  |
//! | `SameDirLimitThenLimitAsHome`      | home direction    | yes      | driver, limit as home  |
//! | `OppositeDirLimitThenLimitAsHome`  | opposite          | -        | driver, limit as home  |
//! | `HalfwayBetweenLimitSwitches`      | both, in turn     | yes      | move to the midpoint   |
//! | `Special`                          | driver-defined    |          |                        |
//!
//! Every strategy that completes latches `HOME_SEARCH_SUCCEEDED`. Any
//! failure ends the search with nothing latched.
//!
//! A `NOWAIT` search that uses a limit switch as home switch leaves the
//! limit bound until the next `wait_for_motor_stop` returns.

use super::moves::raw_direction;
use super::{Motor, required};
use crate::driver::Parameter;
use motion_common::error::{MotorError, MotorResult};
use motion_common::motor::{HomeSearchType, HomeSwitch};
use motion_common::status::{MotorStatus, MoveFlags};
use motion_common::units::Raw;
use tracing::{debug, info};

/// Limit switch bit met when moving in raw `direction`.
fn limit_bit(raw_direction: i32) -> MotorStatus {
    if raw_direction >= 0 {
        MotorStatus::POSITIVE_LIMIT_HIT
    } else {
        MotorStatus::NEGATIVE_LIMIT_HIT
    }
}

impl Motor {
    /// Runs the motor's configured home-search strategy in `direction`
    /// (sign only).
    ///
    /// Limit-switch moves are always waited for. With `NOWAIT` the final
    /// home command is only started, and nothing is latched.
    pub fn home_search(&mut self, direction: i32, flags: MoveFlags) -> MotorResult<()> {
        let direction = if direction >= 0 { 1 } else { -1 };
        let strategy = self.state.home_search_type;
        info!(motor = %self.state.name, ?strategy, direction, "Home search started");

        let completed = match strategy {
            HomeSearchType::Special => self.special_home_search(direction, flags)?,
            HomeSearchType::HalfwayBetweenLimitSwitches => {
                self.home_halfway_between_limits(direction, flags)?;
                true
            }
            _ => self.home_with_limit_plan(strategy, direction, flags)?,
        };

        if completed {
            self.latch_status(MotorStatus::HOME_SEARCH_SUCCEEDED);
            info!(motor = %self.state.name, position = self.state.position, "Home search succeeded");
        }
        Ok(())
    }

    /// Strategies built from an optional limit move and a home command.
    /// Returns whether the home command was waited for.
    fn home_with_limit_plan(
        &mut self,
        strategy: HomeSearchType,
        direction: i32,
        flags: MoveFlags,
    ) -> MotorResult<bool> {
        let mut final_flags = flags;

        if strategy.uses_two_moves() {
            let limit_direction = if strategy.limit_in_same_direction() {
                direction
            } else {
                -direction
            };
            self.drive_to_limit(limit_direction, flags)?;
            if strategy.limit_in_same_direction() {
                self.push_off_limit(limit_direction, flags)?;
            }
            // The home move may start on a limit switch.
            final_flags |= MoveFlags::IGNORE_LIMIT_SWITCHES;
        }

        if strategy.uses_limit_switch_as_home_switch() {
            return self.home_on_limit_switch(direction, final_flags);
        }

        self.find_home_position(direction)?;
        if flags.contains(MoveFlags::NOWAIT) {
            return Ok(false);
        }
        self.wait_for_motor_stop(final_flags)?;
        Ok(true)
    }

    fn special_home_search(&mut self, direction: i32, flags: MoveFlags) -> MotorResult<bool> {
        let raw = raw_direction(direction, self.state.scaling.scale);
        self.begin_command();
        self.state.home_search_in_progress = true;
        let name = self.state.name.clone();
        required(
            self.driver.special_home_search(&mut self.state, raw),
            &name,
            "special_home_search",
        )?;
        if flags.contains(MoveFlags::NOWAIT) {
            return Ok(false);
        }
        self.wait_for_motor_stop(flags)?;
        Ok(true)
    }

    /// Runs the home command with the limit switch in `direction` bound as
    /// the home switch, then restores the previous binding. Returns whether
    /// the home command was waited for.
    fn home_on_limit_switch(&mut self, direction: i32, flags: MoveFlags) -> MotorResult<bool> {
        let previous = self
            .state
            .pending_home_switch
            .take()
            .unwrap_or(self.state.home_switch);
        let raw = raw_direction(direction, self.state.scaling.scale);
        self.state.home_switch = HomeSwitch::limit_in_direction(raw);
        if let Err(e) = self.set_parameter_required(Parameter::HomeSwitch, "home_search") {
            self.state.home_switch = previous;
            return Err(e);
        }
        debug!(motor = %self.state.name, switch = ?self.state.home_switch, "Limit switch bound as home switch");

        let started = self.find_home_position(direction);
        if started.is_ok() && flags.contains(MoveFlags::NOWAIT) {
            self.state.pending_home_switch = Some(previous);
            return Ok(false);
        }
        let homed = started
            .and_then(|()| self.poll_until_stopped(flags | MoveFlags::IGNORE_LIMIT_SWITCHES));

        self.state.home_switch = previous;
        let restored = self.set_parameter_required(Parameter::HomeSwitch, "home_search");
        homed?;
        restored.map(|()| true)
    }

    /// Puts back the home-switch binding left by a `NOWAIT` limit-as-home
    /// search. Does nothing when none is pending.
    pub(crate) fn restore_pending_home_switch(&mut self) -> MotorResult<()> {
        let Some(previous) = self.state.pending_home_switch.take() else {
            return Ok(());
        };
        self.state.home_switch = previous;
        debug!(motor = %self.state.name, switch = ?previous, "Home switch binding restored");
        self.set_parameter_required(Parameter::HomeSwitch, "home_search")
    }

    /// Drives at constant velocity until the limit switch in `direction`
    /// trips. Any other ending is a failure.
    fn drive_to_limit(&mut self, direction: i32, flags: MoveFlags) -> MotorResult<()> {
        self.state.home_search_in_progress = true;
        self.constant_velocity_move(direction)?;
        let expected = limit_bit(self.state.constant_velocity_direction);
        debug!(motor = %self.state.name, direction, "Driving to limit switch");

        let wait_flags = flags - (MoveFlags::NOWAIT | MoveFlags::IGNORE_LIMIT_SWITCHES);
        match self.wait_for_motor_stop(wait_flags) {
            Ok(()) => Err(MotorError::DeviceActionFailed(format!(
                "The move of motor '{}' completed without hitting a limit switch.",
                self.state.name
            ))),
            Err(MotorError::Interrupted(_)) if self.state.status.contains(expected) => {
                debug!(motor = %self.state.name, ?expected, "Limit switch reached");
                Ok(())
            }
            Err(MotorError::Interrupted(reason)) => {
                debug!(motor = %self.state.name, %reason, "Limit move interrupted");
                Err(MotorError::DeviceActionFailed(format!(
                    "The move of motor '{}' completed without hitting a limit switch.",
                    self.state.name
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Backs off the limit switch that was reached moving in `direction`.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the limit bits are still set after the
    /// configured number of checks.
    fn push_off_limit(&mut self, direction: i32, flags: MoveFlags) -> MotorResult<()> {
        let attempts = self.ctx.settings().push_off_attempts;
        let interval = self.ctx.settings().push_off_duration();
        self.constant_velocity_move(-direction)?;

        let mut cleared = false;
        for _ in 0..attempts {
            self.ctx.sleep(interval);
            if !self.get_status()?.intersects(MotorStatus::HARDWARE_LIMITS) {
                cleared = true;
                break;
            }
        }
        if !cleared {
            self.abort_quietly();
            return Err(MotorError::TimedOut(format!(
                "Motor '{}' did not move off its limit switch after {attempts} attempts.",
                self.state.name
            )));
        }

        self.soft_abort()?;
        self.wait_for_motor_stop((flags - MoveFlags::NOWAIT) | MoveFlags::IGNORE_LIMIT_SWITCHES)
    }

    /// Finds both limit switches, moves to the midpoint and makes it the
    /// new zero.
    fn home_halfway_between_limits(&mut self, direction: i32, flags: MoveFlags) -> MotorResult<()> {
        let mut trips = [0.0; 2];
        for (trip, limit_direction) in trips.iter_mut().zip([direction, -direction]) {
            self.drive_to_limit(limit_direction, flags)?;
            *trip = self.get_raw_position()?.as_f64();
            self.push_off_limit(limit_direction, flags)?;
        }

        let middle = Raw::from_f64(self.state.subclass, (trips[0] + trips[1]) / 2.0);
        debug!(motor = %self.state.name, first = trips[0], second = trips[1], %middle, "Moving to midpoint");

        let move_flags = flags - MoveFlags::NOWAIT;
        self.move_to_raw(middle, move_flags)?;
        self.wait_for_motor_stop(move_flags)?;
        self.zero_position_value()
    }
}
