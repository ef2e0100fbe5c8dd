//! Software limit classification.

use super::Motor;
use crate::state::MotorState;
use motion_common::error::{MotorError, MotorResult};
use motion_common::status::MoveFlags;
use motion_common::units::Raw;

/// Where a position lies relative to the software limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitClass {
    Within,
    AbovePositive,
    BelowNegative,
}

/// Classifies a raw position. Steppers compare whole steps, analog motors
/// compare floats.
pub(crate) fn classify_raw(state: &MotorState, raw: Raw) -> LimitClass {
    match (raw, state.raw_positive_limit, state.raw_negative_limit) {
        (Raw::Stepper(p), Raw::Stepper(hi), Raw::Stepper(lo)) => {
            if p > hi {
                LimitClass::AbovePositive
            } else if p < lo {
                LimitClass::BelowNegative
            } else {
                LimitClass::Within
            }
        }
        (p, hi, lo) => {
            let (p, hi, lo) = (p.as_f64(), hi.as_f64(), lo.as_f64());
            if p > hi {
                LimitClass::AbovePositive
            } else if p < lo {
                LimitClass::BelowNegative
            } else {
                LimitClass::Within
            }
        }
    }
}

/// What a limit check is about, for the error message.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LimitCheck {
    Move,
    Backlash,
}

/// Fails with `WouldExceedLimit` if `raw` lies outside the software limits.
pub(crate) fn check_raw_limits(state: &MotorState, raw: Raw, check: LimitCheck) -> MotorResult<()> {
    let (side, limit) = match classify_raw(state, raw) {
        LimitClass::Within => return Ok(()),
        LimitClass::AbovePositive => ("positive", state.raw_positive_limit),
        LimitClass::BelowNegative => ("negative", state.raw_negative_limit),
    };
    let suffix = match raw {
        Raw::Stepper(_) => " steps".to_string(),
        Raw::Analog(_) => state.raw_units_suffix(),
    };
    let message = match check {
        LimitCheck::Move => format!(
            "Move of '{}' to {raw}{suffix} would exceed {side} limit at {limit}{suffix}.",
            state.name
        ),
        LimitCheck::Backlash => format!(
            "Backlash correction for '{}' to {raw}{suffix} would exceed {side} limit at {limit}{suffix}.",
            state.name
        ),
    };
    Err(MotorError::WouldExceedLimit(message))
}

impl Motor {
    /// Classifies an engineering position against the software limits.
    pub fn position_between_software_limits(&self, position: f64) -> LimitClass {
        classify_raw(&self.state, self.state.to_raw(position))
    }

    /// Checks an engineering position against the software limits,
    /// including the backlash pre-move when one would be made.
    ///
    /// No motion takes place.
    ///
    /// # Errors
    ///
    /// Returns `WouldExceedLimit` naming the violated limit.
    pub fn check_position_limits(&mut self, position: f64, flags: MoveFlags) -> MotorResult<()> {
        self.move_absolute(position, flags | MoveFlags::ONLY_CHECK_LIMITS)
    }

    /// Raw form of `position` if it lies within the software limits.
    pub(crate) fn check_move_target(&self, position: f64) -> MotorResult<Raw> {
        let raw = self.state.to_raw(position);
        check_raw_limits(&self.state, raw, LimitCheck::Move)?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{build, stepper};
    use super::*;
    use motion_common::error::ErrorKind;
    use motion_common::motor::MotorConfig;
    use motion_common::units::MotorSubclass;

    #[test]
    fn test_classify_stepper() {
        let (motor, _, _) = stepper(0.0);
        assert_eq!(motor.position_between_software_limits(0.0), LimitClass::Within);
        assert_eq!(motor.position_between_software_limits(1000.0), LimitClass::Within);
        assert_eq!(
            motor.position_between_software_limits(1000.6),
            LimitClass::AbovePositive
        );
        // Rounds to -1000 steps.
        assert_eq!(motor.position_between_software_limits(-1000.4), LimitClass::Within);
        assert_eq!(
            motor.position_between_software_limits(-1001.0),
            LimitClass::BelowNegative
        );
    }

    #[test]
    fn test_classify_negative_scale_uses_raw() {
        let mut config = MotorConfig::new("m", MotorSubclass::Analog);
        config.scale = -1.0;
        config.raw_positive_limit = 10.0;
        config.raw_negative_limit = -5.0;
        let (motor, _, _) = build(&config);
        // Engineering 8 is raw -8.
        assert_eq!(
            motor.position_between_software_limits(8.0),
            LimitClass::BelowNegative
        );
        assert_eq!(
            motor.position_between_software_limits(-8.0),
            LimitClass::Within
        );
    }

    #[test]
    fn test_stepper_message_quotes_steps() {
        let (mut motor, driver, _) = stepper(0.0);
        let err = motor
            .check_position_limits(1500.0, MoveFlags::empty())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldExceedLimit);
        assert_eq!(
            err.message(),
            "Move of 'm' to 1500 steps would exceed positive limit at 1000 steps."
        );
        assert!(driver.axis().visited.is_empty());
    }

    #[test]
    fn test_analog_message_units() {
        let mut config = MotorConfig::new("a", MotorSubclass::Analog);
        config.units = "mm".to_string();
        config.raw_negative_limit = -2.0;
        let (mut motor, _, _) = build(&config);
        let err = motor
            .check_position_limits(-2.5, MoveFlags::empty())
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Move of 'a' to -2.5 mm would exceed negative limit at -2 mm."
        );

        config.scale = 0.5;
        let (mut motor, _, _) = build(&config);
        let err = motor
            .check_position_limits(-2.5, MoveFlags::empty())
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Move of 'a' to -5 would exceed negative limit at -2."
        );
    }

    #[test]
    fn test_check_limits_covers_backlash() {
        let (mut motor, driver, _) = stepper(20.0);
        let err = motor
            .check_position_limits(990.0, MoveFlags::empty())
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Backlash correction for 'm' to 1010 steps would exceed positive limit at 1000 steps."
        );
        assert!(motor.check_position_limits(980.0, MoveFlags::empty()).is_ok());
        assert!(driver.axis().visited.is_empty());
    }
}
