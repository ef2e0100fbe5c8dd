//! Operations on a batch of motors.
//!
//! A batch is a slice of mutable motor borrows, typically obtained from
//! [`MotorRegistry::batch_mut`](crate::registry::MotorRegistry::batch_mut).
//! Status reads and starts always happen in slice order.
//!
//! # Array Move
//!
//! 1. Check every target against its motor's software limits.
//! 2. Unless `IGNORE_BACKLASH`, find the motors whose motion needs a
//!    backlash pre-move and check those positions too.
//! 3. If any motor needs one, start every motor towards its backlash
//!    position and wait for the whole batch.
//! 4. Start every motor towards its target with backlash ignored, then
//!    wait for the whole batch unless `NOWAIT`.
//!
//! Motors are started one by one unless `SIMULTANEOUS_START` asks for a
//! single call to the first motor's driver. If a one-by-one start fails,
//! the motors already started are soft-aborted and the start error is
//! returned.

use crate::driver::SimultaneousMove;
use crate::motor::{Motor, error_mask, warn_conditions};
use motion_common::error::{MotorError, MotorResult};
use motion_common::interrupt::UserInterrupt;
use motion_common::status::{MotorStatus, MoveFlags};
use motion_common::units::Raw;
use tracing::{debug, info, warn};

/// Soft-aborts every motor. Failures are logged, never returned.
pub fn soft_abort_all(motors: &mut [&mut Motor]) {
    for motor in motors.iter_mut() {
        motor.abort_quietly();
    }
}

/// Moves each motor to the matching engineering position.
///
/// # Errors
///
/// - `IllegalArgument` if `positions` and `motors` differ in length.
/// - `WouldExceedLimit` before any motion if a target or backlash position
///   lies outside its motor's limits.
/// - Any start or wait failure, after the batch was aborted as described
///   in the module docs.
pub fn move_array_absolute(
    motors: &mut [&mut Motor],
    positions: &[f64],
    flags: MoveFlags,
) -> MotorResult<()> {
    if motors.len() != positions.len() {
        return Err(MotorError::IllegalArgument(format!(
            "{} positions were given for {} motors.",
            positions.len(),
            motors.len()
        )));
    }
    if motors.is_empty() {
        return Ok(());
    }

    let targets = motors
        .iter()
        .zip(positions)
        .map(|(motor, &position)| motor.check_move_target(position))
        .collect::<MotorResult<Vec<Raw>>>()?;

    if !flags.contains(MoveFlags::IGNORE_BACKLASH) {
        let mut backlash_targets = Vec::with_capacity(motors.len());
        for (motor, &target) in motors.iter_mut().zip(&targets) {
            backlash_targets.push(motor.backlash_target(target)?);
        }

        if backlash_targets.iter().any(Option::is_some) {
            debug!(motors = motors.len(), "Backlash correction for array move");
            let phase_flags = (flags | MoveFlags::GO_TO_BACKLASH_POSITION) - MoveFlags::NOWAIT;

            set_backlash_flags(motors, true);
            let result = start_and_wait(motors, &targets, &backlash_targets, phase_flags);
            set_backlash_flags(motors, false);
            result?;
        }
    }

    let main_targets: Vec<Option<Raw>> = targets.iter().copied().map(Some).collect();
    start_and_wait(
        motors,
        &targets,
        &main_targets,
        flags | MoveFlags::IGNORE_BACKLASH,
    )
}

/// Moves each motor by the matching engineering distance.
pub fn move_array_relative(
    motors: &mut [&mut Motor],
    deltas: &[f64],
    flags: MoveFlags,
) -> MotorResult<()> {
    if motors.len() != deltas.len() {
        return Err(MotorError::IllegalArgument(format!(
            "{} distances were given for {} motors.",
            deltas.len(),
            motors.len()
        )));
    }
    let mut positions = Vec::with_capacity(motors.len());
    for (motor, delta) in motors.iter_mut().zip(deltas) {
        positions.push(motor.get_position()? + delta);
    }
    move_array_absolute(motors, &positions, flags)
}

fn set_backlash_flags(motors: &mut [&mut Motor], in_progress: bool) {
    for motor in motors.iter_mut() {
        motor.set_backlash_move_in_progress(in_progress);
    }
}

/// Starts one phase of an array move and waits for it unless `NOWAIT`.
///
/// `targets` are the final raw targets. `phase` holds the raw position
/// each motor is sent to in this phase, `None` for motors that stay put.
fn start_and_wait(
    motors: &mut [&mut Motor],
    targets: &[Raw],
    phase: &[Option<Raw>],
    flags: MoveFlags,
) -> MotorResult<()> {
    let start_flags = (flags - MoveFlags::SHOW_MOVE) | MoveFlags::NOWAIT;

    if flags.contains(MoveFlags::SIMULTANEOUS_START) {
        start_simultaneously(motors, phase, flags)?;
    } else {
        start_in_sequence(motors, targets, start_flags)?;
    }

    if flags.contains(MoveFlags::SHOW_MOVE) {
        for motor in motors.iter() {
            info!(
                motor = %motor.name(),
                destination = motor.state().destination,
                units = %motor.state().units,
                "Moving"
            );
        }
    }

    if flags.contains(MoveFlags::NOWAIT) {
        return Ok(());
    }
    wait_for_array_stop(motors, flags)
}

fn start_in_sequence(
    motors: &mut [&mut Motor],
    targets: &[Raw],
    flags: MoveFlags,
) -> MotorResult<()> {
    for i in 0..motors.len() {
        if let Err(e) = motors[i].move_to_raw(targets[i], flags) {
            warn!(
                motor = %motors[i].name(),
                error = %e,
                started = i,
                "Array move start failed, aborting motors already started"
            );
            soft_abort_all(&mut motors[..i]);
            return Err(e);
        }
    }
    Ok(())
}

fn start_simultaneously(
    motors: &mut [&mut Motor],
    phase: &[Option<Raw>],
    flags: MoveFlags,
) -> MotorResult<()> {
    let moves: Vec<SimultaneousMove> = motors
        .iter()
        .zip(phase)
        .filter_map(|(motor, raw)| {
            raw.map(|raw_destination| SimultaneousMove {
                motor: motor.name().to_string(),
                raw_destination,
            })
        })
        .collect();
    if moves.is_empty() {
        return Ok(());
    }

    motors[0].simultaneous_start(&moves)?;

    let primary = !flags.contains(MoveFlags::GO_TO_BACKLASH_POSITION);
    for (motor, raw) in motors.iter_mut().zip(phase) {
        if let Some(raw) = raw {
            motor.record_simultaneous_start(*raw, primary);
        }
    }
    Ok(())
}

/// Polls every motor until all have stopped.
///
/// Each cycle reads every motor's status in order and warns about limit
/// hits and error conditions. Any status read failure, error bit (limits
/// included unless `IGNORE_LIMIT_SWITCHES`, nothing under
/// `IGNORE_ERRORS`) or user abort soft-aborts the whole batch. Pause and
/// interrupt poll errors are handled as in
/// [`Motor::wait_for_motor_stop`].
pub fn wait_for_array_stop(motors: &mut [&mut Motor], flags: MoveFlags) -> MotorResult<()> {
    let Some(ctx) = motors.first().map(|m| m.context().clone()) else {
        return Ok(());
    };
    let ignore_limits = flags.contains(MoveFlags::IGNORE_LIMIT_SWITCHES);
    let errors = error_mask(flags);
    let show_progress = flags.contains(MoveFlags::SHOW_MOVE) || ctx.settings().show_progress;
    let progress_interval = ctx.settings().progress_duration();
    let mut last_report = ctx.now();

    loop {
        let mut moving = false;
        let mut any_error = false;

        for i in 0..motors.len() {
            let status = match motors[i].get_status() {
                Ok(status) => status,
                Err(e) => {
                    soft_abort_all(motors);
                    return Err(e);
                }
            };
            let name = motors[i].name();
            moving |= status.is_busy();

            if !ignore_limits {
                if status.intersects(MotorStatus::HARDWARE_LIMITS) {
                    warn!(motor = %name, "Hardware limit hit");
                }
                if status.intersects(MotorStatus::SOFT_LIMITS) {
                    warn!(motor = %name, "Software limit hit");
                }
            }
            if status.intersects(errors) {
                warn!(motor = %name, status = format_args!("{:#x}", status.bits()), "Error occurred");
                any_error = true;
            }
            warn_conditions(name, status);
        }

        if any_error {
            soft_abort_all(motors);
            return Err(MotorError::Interrupted(
                "Motor moves aborted due to errors.".to_string(),
            ));
        }

        if !moving {
            return Ok(());
        }

        if !flags.contains(MoveFlags::IGNORE_KEYBOARD) {
            match ctx.poll_interrupt() {
                UserInterrupt::None => {}
                UserInterrupt::Abort => {
                    soft_abort_all(motors);
                    return Err(MotorError::Interrupted("Motor moves aborted.".to_string()));
                }
                UserInterrupt::Pause if flags.contains(MoveFlags::IGNORE_PAUSE) => {}
                UserInterrupt::Pause => {
                    return Err(MotorError::PauseRequested(
                        "Pause requested by user.".to_string(),
                    ));
                }
                UserInterrupt::Error => {
                    return Err(MotorError::FunctionFailed(
                        "An error occurred while checking for a user requested interrupt."
                            .to_string(),
                    ));
                }
            }
        }

        if show_progress {
            let now = ctx.now();
            if now.saturating_since(last_report) >= progress_interval {
                last_report = now;
                for motor in motors.iter() {
                    info!(
                        motor = %motor.name(),
                        position = motor.state().position,
                        destination = motor.state().destination,
                        "Moving"
                    );
                }
            }
        }

        ctx.sleep_poll_interval();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::testing::{FakeDriver, context_with, stepper};
    use motion_common::error::ErrorKind;
    use motion_common::interrupt::ScriptedInterrupts;
    use motion_common::motor::MotorConfig;
    use motion_common::units::MotorSubclass;

    fn batch(backlash: f64) -> (Vec<Motor>, Vec<FakeDriver>) {
        (0..3)
            .map(|_| {
                let (motor, driver, _) = stepper(backlash);
                (motor, driver)
            })
            .unzip()
    }

    fn called(driver: &FakeDriver, call: &str) -> bool {
        driver.axis().calls.iter().any(|c| c == call)
    }

    #[test]
    fn test_start_failure_aborts_started_motors() {
        let (mut motors, drivers) = batch(0.0);
        drivers[2].axis().failing.insert("move_absolute");
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();

        let err = move_array_absolute(&mut refs, &[1.0, 2.0, 3.0], MoveFlags::empty()).unwrap_err();
        assert_eq!(err, MotorError::DeviceIo("move_absolute failed".to_string()));
        assert!(called(&drivers[0], "soft_abort"));
        assert!(called(&drivers[1], "soft_abort"));
        assert!(!called(&drivers[2], "soft_abort"));
    }

    #[test]
    fn test_backlash_phase_then_main_phase() {
        let (mut motors, drivers) = batch(2.0);
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        move_array_absolute(&mut refs, &[10.0, -10.0, 5.0], MoveFlags::empty()).unwrap();

        assert_eq!(drivers[0].axis().visited, vec![12.0, 10.0]);
        assert_eq!(drivers[1].axis().visited, vec![-10.0]);
        assert_eq!(drivers[2].axis().visited, vec![7.0, 5.0]);
        assert!(motors.iter().all(|m| !m.state().backlash_move_in_progress));
        assert_eq!(motors[0].state().destination, 10.0);
    }

    #[test]
    fn test_limits_checked_before_any_motion() {
        let (mut motors, drivers) = batch(0.0);
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        let err = move_array_absolute(&mut refs, &[1.0, 2.0, 5000.0], MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldExceedLimit);
        assert!(drivers.iter().all(|d| d.axis().visited.is_empty()));
    }

    #[test]
    fn test_backlash_limit_checked_before_any_motion() {
        let (mut motors, drivers) = batch(5.0);
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        let err = move_array_absolute(&mut refs, &[1.0, 2.0, 998.0], MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldExceedLimit);
        assert!(err.message().starts_with("Backlash correction"));
        assert!(drivers.iter().all(|d| d.axis().visited.is_empty()));
    }

    #[test]
    fn test_simultaneous_start_uses_first_driver() {
        let (mut motors, drivers) = batch(0.0);
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        move_array_absolute(&mut refs, &[1.0, 2.0, 3.0], MoveFlags::SIMULTANEOUS_START).unwrap();

        assert!(called(&drivers[0], "start 3"));
        assert!(!called(&drivers[1], "simultaneous_start"));
        assert!(drivers.iter().all(|d| d.axis().visited.is_empty()));
        assert_eq!(motors[2].state().destination, 3.0);
    }

    #[test]
    fn test_simultaneous_start_unsupported() {
        let (mut motors, drivers) = batch(0.0);
        drivers[0].axis().absent.insert("simultaneous_start");
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        let err = move_array_absolute(&mut refs, &[1.0, 2.0, 3.0], MoveFlags::SIMULTANEOUS_START)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.message().contains("simultaneous starts"));
    }

    #[test]
    fn test_length_mismatch() {
        let (mut motors, _) = batch(0.0);
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        let err = move_array_absolute(&mut refs, &[1.0], MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgument);
    }

    #[test]
    fn test_move_array_relative() {
        let (mut motors, drivers) = batch(0.0);
        drivers[1].axis().raw_position = 100.0;
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        move_array_relative(&mut refs, &[1.0, -1.0, 0.0], MoveFlags::IGNORE_BACKLASH).unwrap();
        assert_eq!(drivers[0].axis().visited, vec![1.0]);
        assert_eq!(drivers[1].axis().visited, vec![99.0]);
    }

    #[test]
    fn test_wait_error_aborts_every_motor() {
        let (mut motors, drivers) = batch(0.0);
        for driver in &drivers {
            driver.axis().busy_remaining = 50;
        }
        drivers[1].axis().status = MotorStatus::FOLLOWING_ERROR;
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();

        let err = wait_for_array_stop(&mut refs, MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert!(drivers.iter().all(|d| called(d, "soft_abort")));
    }

    #[test]
    fn test_wait_ignores_limits_on_request() {
        let (mut motors, drivers) = batch(0.0);
        drivers[0].axis().status = MotorStatus::POSITIVE_LIMIT_HIT;
        drivers[2].axis().busy_remaining = 4;
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();
        wait_for_array_stop(&mut refs, MoveFlags::IGNORE_LIMIT_SWITCHES).unwrap();
        assert!(!drivers.iter().any(|d| called(d, "soft_abort")));

        let err = wait_for_array_stop(&mut refs, MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
    }

    #[test]
    fn test_user_abort_stops_the_batch() {
        let (ctx, _) = context_with(Box::new(ScriptedInterrupts::after(1, UserInterrupt::Abort)));
        let drivers: Vec<FakeDriver> = (0..2).map(|_| FakeDriver::new()).collect();
        let mut motors: Vec<Motor> = drivers
            .iter()
            .map(|d| {
                d.axis().busy_remaining = 100;
                let config = MotorConfig::new("m", MotorSubclass::Stepper);
                Motor::new(&config, Box::new(d.clone()), ctx.clone()).unwrap()
            })
            .collect();
        let mut refs: Vec<&mut Motor> = motors.iter_mut().collect();

        let err = wait_for_array_stop(&mut refs, MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert!(drivers.iter().all(|d| called(d, "soft_abort")));
    }

    #[test]
    fn test_empty_batch() {
        let mut refs: Vec<&mut Motor> = Vec::new();
        wait_for_array_stop(&mut refs, MoveFlags::empty()).unwrap();
        move_array_absolute(&mut refs, &[], MoveFlags::empty()).unwrap();
    }
}
