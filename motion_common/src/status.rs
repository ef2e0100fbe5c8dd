//! Motor status bits, move flags and motor flags.
//!
//! ## Status Bit Layout
//!
//! | Bit    | Name                      | In `ERROR_BITMASK` |
//! |--------|---------------------------|--------------------|
//! | 0x0001 | `BUSY`                    | no                 |
//! | 0x0002 | `POSITIVE_LIMIT_HIT`      | yes                |
//! | 0x0004 | `NEGATIVE_LIMIT_HIT`      | yes                |
//! | 0x0008 | `HOME_SEARCH_SUCCEEDED`   | no (latched)       |
//! | 0x0010 | `FOLLOWING_ERROR`         | yes                |
//! | 0x0020 | `DRIVE_FAULT`             | yes                |
//! | 0x0040 | `AXIS_DISABLED`           | yes                |
//! | 0x0080 | `OPEN_LOOP`               | yes                |
//! | 0x0100 | `SOFT_POSITIVE_LIMIT_HIT` | yes                |
//! | 0x0200 | `SOFT_NEGATIVE_LIMIT_HIT` | yes                |
//! | 0x8000_0000 | `ERROR`              | derived            |

use bitflags::bitflags;
use static_assertions::const_assert_eq;

bitflags! {
    /// Aggregated motor status word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MotorStatus: u32 {
        const BUSY                    = 0x0000_0001;
        const POSITIVE_LIMIT_HIT      = 0x0000_0002;
        const NEGATIVE_LIMIT_HIT      = 0x0000_0004;
        const HOME_SEARCH_SUCCEEDED   = 0x0000_0008;
        const FOLLOWING_ERROR         = 0x0000_0010;
        const DRIVE_FAULT             = 0x0000_0020;
        const AXIS_DISABLED           = 0x0000_0040;
        const OPEN_LOOP               = 0x0000_0080;
        const SOFT_POSITIVE_LIMIT_HIT = 0x0000_0100;
        const SOFT_NEGATIVE_LIMIT_HIT = 0x0000_0200;
        const ERROR                   = 0x8000_0000;
    }
}

impl MotorStatus {
    /// Bits whose presence sets `ERROR`.
    pub const ERROR_BITMASK: Self = Self::from_bits_truncate(
        Self::POSITIVE_LIMIT_HIT.bits()
            | Self::NEGATIVE_LIMIT_HIT.bits()
            | Self::FOLLOWING_ERROR.bits()
            | Self::DRIVE_FAULT.bits()
            | Self::AXIS_DISABLED.bits()
            | Self::OPEN_LOOP.bits()
            | Self::SOFT_POSITIVE_LIMIT_HIT.bits()
            | Self::SOFT_NEGATIVE_LIMIT_HIT.bits(),
    );

    /// Hardware limit switch bits.
    pub const HARDWARE_LIMITS: Self = Self::from_bits_truncate(
        Self::POSITIVE_LIMIT_HIT.bits() | Self::NEGATIVE_LIMIT_HIT.bits(),
    );

    /// Software limit bits.
    pub const SOFT_LIMITS: Self = Self::from_bits_truncate(
        Self::SOFT_POSITIVE_LIMIT_HIT.bits() | Self::SOFT_NEGATIVE_LIMIT_HIT.bits(),
    );

    /// All limit bits, hardware and software.
    pub const ALL_LIMITS: Self =
        Self::from_bits_truncate(Self::HARDWARE_LIMITS.bits() | Self::SOFT_LIMITS.bits());

    /// Bits that persist across status reads until the next command.
    pub const LATCHED: Self = Self::HOME_SEARCH_SUCCEEDED;

    /// Returns `self` with `ERROR` set if any `ERROR_BITMASK` bit is present.
    pub const fn with_derived_error(self) -> Self {
        if self.bits() & Self::ERROR_BITMASK.bits() != 0 {
            Self::from_bits_retain(self.bits() | Self::ERROR.bits())
        } else {
            self
        }
    }

    /// Whether the motor is moving.
    pub const fn is_busy(self) -> bool {
        self.bits() & Self::BUSY.bits() != 0
    }
}

impl Default for MotorStatus {
    fn default() -> Self {
        Self::empty()
    }
}

const_assert_eq!(
    MotorStatus::ERROR_BITMASK.bits() & MotorStatus::BUSY.bits(),
    0
);
const_assert_eq!(
    MotorStatus::ERROR_BITMASK.bits() & MotorStatus::LATCHED.bits(),
    0
);

bitflags! {
    /// Options modifying a move or a wait.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MoveFlags: u32 {
        /// Return as soon as the move is issued.
        const NOWAIT                  = 0x0001;
        const IGNORE_BACKLASH         = 0x0002;
        /// Stop after the backlash pre-move.
        const GO_TO_BACKLASH_POSITION = 0x0004;
        /// Check software limits only, no motion.
        const ONLY_CHECK_LIMITS       = 0x0008;
        const IGNORE_KEYBOARD         = 0x0010;
        const IGNORE_LIMIT_SWITCHES   = 0x0020;
        const IGNORE_PAUSE            = 0x0040;
        const IGNORE_ERRORS           = 0x0080;
        const SIMULTANEOUS_START      = 0x0100;
        /// Emit periodic progress while waiting.
        const SHOW_MOVE               = 0x0200;
    }
}

impl Default for MoveFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Static per-motor flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MotorFlags: u32 {
        const IS_PSEUDOMOTOR      = 0x0001;
        const IS_REMOTE_MOTOR     = 0x0002;
        const CANNOT_CHANGE_SPEED = 0x0004;
    }
}

impl Default for MotorFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_derived_from_bitmask() {
        let s = (MotorStatus::BUSY | MotorStatus::DRIVE_FAULT).with_derived_error();
        assert!(s.contains(MotorStatus::ERROR));

        let s = MotorStatus::BUSY.with_derived_error();
        assert!(!s.contains(MotorStatus::ERROR));
        assert!(s.is_busy());
    }

    #[test]
    fn test_latched_not_an_error() {
        let s = MotorStatus::HOME_SEARCH_SUCCEEDED.with_derived_error();
        assert!(!s.contains(MotorStatus::ERROR));
    }

    #[test]
    fn test_limit_masks() {
        assert!(MotorStatus::ALL_LIMITS.contains(MotorStatus::SOFT_NEGATIVE_LIMIT_HIT));
        assert!(!MotorStatus::HARDWARE_LIMITS.contains(MotorStatus::SOFT_POSITIVE_LIMIT_HIT));
        assert!(MotorStatus::ERROR_BITMASK.contains(MotorStatus::ALL_LIMITS));
    }

    #[test]
    fn test_defaults_empty() {
        assert!(MotorStatus::default().is_empty());
        assert!(MoveFlags::default().is_empty());
        assert!(MotorFlags::default().is_empty());
    }
}
