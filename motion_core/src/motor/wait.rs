//! Cooperative wait for a single motor.

use super::Motor;
use motion_common::error::{MotorError, MotorResult};
use motion_common::interrupt::UserInterrupt;
use motion_common::status::{MotorStatus, MoveFlags};
use tracing::{info, warn};

/// Error bits reported with a dedicated warning before a wait fails.
const CONDITION_WARNINGS: [(MotorStatus, &str); 4] = [
    (MotorStatus::FOLLOWING_ERROR, "Following error"),
    (MotorStatus::DRIVE_FAULT, "Drive fault"),
    (MotorStatus::AXIS_DISABLED, "Axis is disabled"),
    (MotorStatus::OPEN_LOOP, "Motor is open loop"),
];

/// Error bits a wait treats as fatal under `flags`.
pub(crate) fn error_mask(flags: MoveFlags) -> MotorStatus {
    if flags.contains(MoveFlags::IGNORE_ERRORS) {
        MotorStatus::empty()
    } else if flags.contains(MoveFlags::IGNORE_LIMIT_SWITCHES) {
        MotorStatus::ERROR_BITMASK - MotorStatus::ALL_LIMITS
    } else {
        MotorStatus::ERROR_BITMASK
    }
}

/// Logs one warning per specific error condition in `status`.
pub(crate) fn warn_conditions(motor: &str, status: MotorStatus) {
    for (bit, what) in CONDITION_WARNINGS {
        if status.contains(bit) {
            warn!(motor, "{what}");
        }
    }
}

impl Motor {
    /// Polls the motor until it stops.
    ///
    /// Each iteration reads the status, then:
    /// - a hardware or software limit bit soft-aborts the motor and fails
    ///   with `Interrupted`, unless `IGNORE_LIMIT_SWITCHES`;
    /// - any other error bit fails with `Interrupted`, unless `IGNORE_ERRORS`;
    /// - a motor that is not busy ends the wait;
    /// - the user-interrupt source is polled, unless `IGNORE_KEYBOARD`.
    ///   Abort soft-aborts and fails with `Interrupted`, pause fails with
    ///   `PauseRequested` unless `IGNORE_PAUSE`, and a poll error fails with
    ///   `FunctionFailed`.
    ///
    /// There is no overall timeout. A home-switch binding left by a
    /// `NOWAIT` home search is restored whichever way the wait ends.
    pub fn wait_for_motor_stop(&mut self, flags: MoveFlags) -> MotorResult<()> {
        let waited = self.poll_until_stopped(flags);
        let restored = self.restore_pending_home_switch();
        waited?;
        restored
    }

    pub(crate) fn poll_until_stopped(&mut self, flags: MoveFlags) -> MotorResult<()> {
        let show_progress =
            flags.contains(MoveFlags::SHOW_MOVE) || self.ctx.settings().show_progress;
        let progress_interval = self.ctx.settings().progress_duration();
        let errors = error_mask(flags);
        let mut last_report = self.ctx.now();

        loop {
            let status = self.get_status()?;

            if !flags.contains(MoveFlags::IGNORE_LIMIT_SWITCHES) {
                if status.intersects(MotorStatus::HARDWARE_LIMITS) {
                    self.abort_quietly();
                    return Err(MotorError::Interrupted(format!(
                        "Hardware limit hit. Move aborted for motor '{}'.",
                        self.state.name
                    )));
                }
                if status.intersects(MotorStatus::SOFT_LIMITS) {
                    self.abort_quietly();
                    return Err(MotorError::Interrupted(format!(
                        "Software limit hit. Move aborted for motor '{}'.",
                        self.state.name
                    )));
                }
            }

            if status.intersects(errors) {
                warn_conditions(&self.state.name, status);
                return Err(MotorError::Interrupted(format!(
                    "Move aborted for motor '{}' due to errors. Motor status = {:#x}",
                    self.state.name,
                    status.bits()
                )));
            }

            if !status.is_busy() {
                return Ok(());
            }

            if !flags.contains(MoveFlags::IGNORE_KEYBOARD) {
                match self.ctx.poll_interrupt() {
                    UserInterrupt::None => {}
                    UserInterrupt::Abort => {
                        self.abort_quietly();
                        return Err(MotorError::Interrupted(format!(
                            "Move of motor '{}' aborted by user.",
                            self.state.name
                        )));
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
                let now = self.ctx.now();
                if now.saturating_since(last_report) >= progress_interval {
                    last_report = now;
                    info!(
                        motor = %self.state.name,
                        position = self.state.position,
                        destination = self.state.destination,
                        "Moving"
                    );
                }
            }

            self.ctx.sleep_poll_interval();
        }
    }

    /// Soft abort whose failure is only logged.
    pub(crate) fn abort_quietly(&mut self) {
        if let Err(e) = self.soft_abort() {
            warn!(motor = %self.state.name, error = %e, "Soft abort failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{build, context_with, stepper};
    use super::*;
    use crate::motor::testing::FakeDriver;
    use motion_common::clock::Clock;
    use motion_common::error::ErrorKind;
    use motion_common::interrupt::ScriptedInterrupts;
    use motion_common::motor::MotorConfig;
    use motion_common::units::MotorSubclass;

    fn with_interrupt(interrupt: UserInterrupt, after: usize) -> (Motor, FakeDriver) {
        let driver = FakeDriver::new();
        let (ctx, _) = context_with(Box::new(ScriptedInterrupts::after(after, interrupt)));
        let config = MotorConfig::new("m", MotorSubclass::Stepper);
        let motor = Motor::new(&config, Box::new(driver.clone()), ctx).unwrap();
        driver.axis().busy_remaining = 100;
        (motor, driver)
    }

    fn soft_aborted(driver: &FakeDriver) -> bool {
        driver.axis().calls.contains(&"soft_abort".to_string())
    }

    #[test]
    fn test_wait_until_idle() {
        let (mut motor, driver, clock) = stepper(0.0);
        driver.axis().busy_remaining = 5;
        motor.wait_for_motor_stop(MoveFlags::empty()).unwrap();
        // Five busy reads, five 10 ms sleeps.
        assert!((clock.now().as_secs_f64() - 0.05).abs() < 1e-9);
        assert!(!soft_aborted(&driver));
    }

    #[test]
    fn test_hardware_limit_aborts() {
        let (mut motor, driver, _) = stepper(0.0);
        {
            let mut axis = driver.axis();
            axis.busy_remaining = 10;
            axis.status = MotorStatus::NEGATIVE_LIMIT_HIT;
        }
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert!(err.message().starts_with("Hardware limit hit"));
        assert!(soft_aborted(&driver));
    }

    #[test]
    fn test_soft_limit_aborts() {
        let (mut motor, driver, _) = stepper(0.0);
        driver.axis().status = MotorStatus::SOFT_POSITIVE_LIMIT_HIT;
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert!(err.message().starts_with("Software limit hit"));
        assert!(soft_aborted(&driver));
    }

    #[test]
    fn test_ignore_limit_switches() {
        let (mut motor, driver, _) = stepper(0.0);
        {
            let mut axis = driver.axis();
            axis.busy_remaining = 2;
            axis.status = MotorStatus::POSITIVE_LIMIT_HIT;
        }
        motor
            .wait_for_motor_stop(MoveFlags::IGNORE_LIMIT_SWITCHES)
            .unwrap();
        assert!(!soft_aborted(&driver));
    }

    #[test]
    fn test_error_bits_fail_without_abort() {
        let (mut motor, driver, _) = stepper(0.0);
        driver.axis().status = MotorStatus::DRIVE_FAULT | MotorStatus::FOLLOWING_ERROR;
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert!(err.message().contains("due to errors"));
        assert!(!soft_aborted(&driver));

        motor.wait_for_motor_stop(MoveFlags::IGNORE_ERRORS).unwrap();
    }

    #[test]
    fn test_user_abort() {
        let (mut motor, driver) = with_interrupt(UserInterrupt::Abort, 2);
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert!(soft_aborted(&driver));
    }

    #[test]
    fn test_user_pause() {
        let (mut motor, driver) = with_interrupt(UserInterrupt::Pause, 0);
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PauseRequested);
        assert!(!soft_aborted(&driver));
    }

    #[test]
    fn test_ignore_pause_keeps_waiting() {
        let (mut motor, driver) = with_interrupt(UserInterrupt::Pause, 0);
        driver.axis().busy_remaining = 3;
        motor.wait_for_motor_stop(MoveFlags::IGNORE_PAUSE).unwrap();
    }

    #[test]
    fn test_interrupt_poll_error() {
        let (mut motor, _) = with_interrupt(UserInterrupt::Error, 1);
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FunctionFailed);
    }

    #[test]
    fn test_ignore_keyboard() {
        let (mut motor, driver) = with_interrupt(UserInterrupt::Abort, 0);
        driver.axis().busy_remaining = 3;
        motor.wait_for_motor_stop(MoveFlags::IGNORE_KEYBOARD).unwrap();
        assert!(!soft_aborted(&driver));
    }

    #[test]
    fn test_status_failure_propagates() {
        let mut config = MotorConfig::new("m", MotorSubclass::Stepper);
        config.raw_positive_limit = 10.0;
        let (mut motor, driver, _) = build(&config);
        driver.axis().failing.insert("get_status");
        let err = motor.wait_for_motor_stop(MoveFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceIo);
    }

    #[test]
    fn test_error_mask() {
        assert_eq!(error_mask(MoveFlags::IGNORE_ERRORS), MotorStatus::empty());
        let mask = error_mask(MoveFlags::IGNORE_LIMIT_SWITCHES);
        assert!(mask.contains(MotorStatus::DRIVE_FAULT));
        assert!(!mask.intersects(MotorStatus::ALL_LIMITS));
    }
}
