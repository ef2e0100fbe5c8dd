//! Raw ↔ engineering unit conversion.
//!
//! A motor position exists in two forms:
//! - **raw**: the device-native value, either an integer step count
//!   ([`Raw::Stepper`]) or a continuous value ([`Raw::Analog`]);
//! - **engineering**: `offset + scale * raw`.
//!
//! The inverse uses [`safe_divide`], so a degenerate scale maps every
//! engineering value to a raw value of zero instead of infinity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used to decide whether an analog scale is effectively 1.
pub const ANALOG_FUZZ: f64 = 1.0e-12;

/// Motor subclass. Selects which [`Raw`] variant is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MotorSubclass {
    /// Integer step count.
    #[default]
    Stepper,
    /// Continuous device value.
    Analog,
}

impl fmt::Display for MotorSubclass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stepper => f.write_str("stepper"),
            Self::Analog => f.write_str("analog"),
        }
    }
}

/// Device-native position or distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Raw {
    Stepper(i64),
    Analog(f64),
}

impl Raw {
    /// Zero in the representation of `subclass`.
    pub const fn zero(subclass: MotorSubclass) -> Self {
        match subclass {
            MotorSubclass::Stepper => Self::Stepper(0),
            MotorSubclass::Analog => Self::Analog(0.0),
        }
    }

    /// Builds a raw value for `subclass`, rounding to whole steps for steppers.
    pub fn from_f64(subclass: MotorSubclass, value: f64) -> Self {
        match subclass {
            MotorSubclass::Stepper => Self::Stepper(round_steps(value)),
            MotorSubclass::Analog => Self::Analog(value),
        }
    }

    pub const fn subclass(self) -> MotorSubclass {
        match self {
            Self::Stepper(_) => MotorSubclass::Stepper,
            Self::Analog(_) => MotorSubclass::Analog,
        }
    }

    /// Value as a float, regardless of representation.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Stepper(steps) => steps as f64,
            Self::Analog(value) => value,
        }
    }

    /// Absolute value, keeping the representation.
    pub fn abs(self) -> Self {
        match self {
            Self::Stepper(steps) => Self::Stepper(steps.saturating_abs()),
            Self::Analog(value) => Self::Analog(value.abs()),
        }
    }

    /// `self - other`, in the representation of `self`.
    pub fn delta(self, other: Self) -> Self {
        match self {
            Self::Stepper(a) => Self::Stepper(a.saturating_sub(round_steps(other.as_f64()))),
            Self::Analog(a) => Self::Analog(a - other.as_f64()),
        }
    }

    /// `self + other`, in the representation of `self`.
    pub fn offset_by(self, other: Self) -> Self {
        match self {
            Self::Stepper(a) => Self::Stepper(a.saturating_add(round_steps(other.as_f64()))),
            Self::Analog(a) => Self::Analog(a + other.as_f64()),
        }
    }

    /// Sign of the value: -1, 0 or 1.
    pub fn signum(self) -> i32 {
        match self {
            Self::Stepper(steps) => steps.signum() as i32,
            Self::Analog(value) if value > 0.0 => 1,
            Self::Analog(value) if value < 0.0 => -1,
            Self::Analog(_) => 0,
        }
    }

    pub fn is_zero(self) -> bool {
        self.signum() == 0
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stepper(steps) => write!(f, "{steps}"),
            Self::Analog(value) => write!(f, "{value}"),
        }
    }
}

/// Rounds a float to the nearest step count, saturating at the `i64` range.
pub fn round_steps(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    // `as` saturates for out-of-range floats.
    value.round() as i64
}

/// Divides `numerator` by `denominator`, returning 0 when the denominator
/// is zero or so small that the quotient would overflow.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() >= 1.0 {
        return numerator / denominator;
    }
    if denominator.abs() < f64::MIN_POSITIVE {
        return 0.0;
    }
    if numerator.abs() < (denominator * f64::MAX).abs() {
        numerator / denominator
    } else {
        0.0
    }
}

/// Offset/scale pair relating raw and engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl Scaling {
    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// Engineering position of a raw position.
    pub fn to_engineering(&self, raw: Raw) -> f64 {
        self.offset + self.scale * raw.as_f64()
    }

    /// Raw position of an engineering position, in `subclass` form.
    pub fn to_raw(&self, subclass: MotorSubclass, engineering: f64) -> Raw {
        Raw::from_f64(subclass, safe_divide(engineering - self.offset, self.scale))
    }

    /// Engineering length of a raw distance (no offset).
    pub fn distance_to_engineering(&self, raw: Raw) -> f64 {
        self.scale * raw.as_f64()
    }

    /// Raw distance of an engineering length (no offset).
    pub fn distance_to_raw(&self, subclass: MotorSubclass, engineering: f64) -> Raw {
        Raw::from_f64(subclass, safe_divide(engineering, self.scale))
    }

    /// Whether raw values are numerically engineering values, up to sign.
    ///
    /// Messages about raw analog values only quote engineering units when
    /// this holds.
    pub fn raw_matches_engineering(&self) -> bool {
        (self.scale.abs() - 1.0).abs() < ANALOG_FUZZ
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_divide_regular() {
        assert_eq!(safe_divide(10.0, 4.0), 2.5);
        assert_eq!(safe_divide(-1.0, 0.5), -2.0);
    }

    #[test]
    fn test_safe_divide_zero_denominator() {
        assert_eq!(safe_divide(5.0, 0.0), 0.0);
        assert_eq!(safe_divide(5.0, -0.0), 0.0);
        assert_eq!(safe_divide(1.0e300, 1.0e-300), 0.0);
    }

    #[test]
    fn test_stepper_rounds_to_nearest_step() {
        let scaling = Scaling::new(0.5, 0.0);
        assert_eq!(scaling.to_raw(MotorSubclass::Stepper, 1.2), Raw::Stepper(2));
        assert_eq!(scaling.to_raw(MotorSubclass::Stepper, 1.3), Raw::Stepper(3));
        assert_eq!(scaling.to_raw(MotorSubclass::Stepper, -1.3), Raw::Stepper(-3));
    }

    #[test]
    fn test_analog_is_continuous() {
        let scaling = Scaling::new(2.0, 1.0);
        assert_eq!(scaling.to_raw(MotorSubclass::Analog, 4.0), Raw::Analog(1.5));
        assert_eq!(scaling.to_engineering(Raw::Analog(1.5)), 4.0);
    }

    #[test]
    fn test_engineering_round_trip_within_tolerance() {
        for &(scale, offset) in &[(0.001, 3.0), (-2.5, -7.25), (1.0e3, 0.0)] {
            let scaling = Scaling::new(scale, offset);
            for &raw in &[-1234.5, 0.0, 17.25, 99999.0] {
                let eng = scaling.to_engineering(Raw::Analog(raw));
                let back = scaling.to_raw(MotorSubclass::Analog, eng).as_f64();
                assert!((back - raw).abs() < 1e-6, "scale {scale} raw {raw} -> {back}");
            }
        }
    }

    #[test]
    fn test_zero_scale_maps_to_zero_raw() {
        let scaling = Scaling::new(0.0, 5.0);
        assert_eq!(scaling.to_raw(MotorSubclass::Stepper, 123.0), Raw::Stepper(0));
    }

    #[test]
    fn test_raw_arithmetic_keeps_representation() {
        assert_eq!(Raw::Stepper(10).delta(Raw::Stepper(3)), Raw::Stepper(7));
        assert_eq!(Raw::Analog(1.5).offset_by(Raw::Analog(0.25)), Raw::Analog(1.75));
        assert_eq!(Raw::Stepper(-4).signum(), -1);
        assert!(Raw::Analog(0.0).is_zero());
    }

    #[test]
    fn test_raw_matches_engineering() {
        assert!(Scaling::new(1.0, 0.0).raw_matches_engineering());
        assert!(Scaling::new(-1.0, 3.0).raw_matches_engineering());
        assert!(!Scaling::new(0.01, 0.0).raw_matches_engineering());
    }
}
