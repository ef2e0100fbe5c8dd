//! Estimated move durations along a list of waypoints.
//!
//! Each segment between consecutive waypoints is timed with a symmetric
//! acceleration profile:
//!
//! | Condition                   | Profile     | Duration                    |
//! |-----------------------------|-------------|-----------------------------|
//! | `length - 2·d_acc >= 0`     | trapezoidal | `(length - 2·d_acc)/v + 2·t_acc` |
//! | otherwise                   | triangular  | `2·sqrt(length / a)`        |
//!
//! with `a = v / t_acc`. A speed or ramp time of zero times every segment
//! at zero.

use super::Motor;
use motion_common::error::MotorResult;
use motion_common::units::ANALOG_FUZZ;
use tracing::debug;

/// Waypoints and their cached segment durations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveEstimate {
    positions: Vec<f64>,
    durations: Vec<f64>,
    dirty: bool,
}

impl MoveEstimate {
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Whether the durations need recomputing.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn invalidate(&mut self) {
        self.dirty = true;
    }
}

/// Seconds needed to travel `length` engineering units.
pub fn segment_duration(length: f64, speed: f64, accel_time: f64, accel_distance: f64) -> f64 {
    if speed.abs() < ANALOG_FUZZ || accel_time.abs() < ANALOG_FUZZ {
        return 0.0;
    }
    let length = length.abs();
    let cruise = length - 2.0 * accel_distance;
    if cruise >= 0.0 {
        cruise / speed + 2.0 * accel_time
    } else {
        let acceleration = speed / accel_time;
        let t_mid = (2.0 * (length / 2.0) / acceleration).sqrt();
        2.0 * t_mid
    }
}

impl Motor {
    /// Replaces the waypoints. Durations are recomputed on the next read.
    pub fn set_estimated_move_positions(&mut self, positions: &[f64]) {
        self.estimate.positions = positions.to_vec();
        self.estimate.durations.clear();
        self.estimate.dirty = true;
    }

    pub fn estimated_move(&self) -> &MoveEstimate {
        &self.estimate
    }

    /// Duration of each segment between consecutive waypoints, in seconds.
    ///
    /// Reads speed and acceleration from the driver only when the
    /// waypoints or motion parameters changed since the last call.
    pub fn estimated_move_durations(&mut self) -> MotorResult<&[f64]> {
        if self.estimate.dirty {
            let speed = self.speed()?;
            let accel_time = self.acceleration_time()?;
            let accel_distance = self.acceleration_distance()?;

            self.estimate.durations = self
                .estimate
                .positions
                .windows(2)
                .map(|w| segment_duration(w[1] - w[0], speed, accel_time, accel_distance))
                .collect();
            self.estimate.dirty = false;
            debug!(
                motor = %self.state.name,
                segments = self.estimate.durations.len(),
                "Estimated move durations recomputed"
            );
        }
        Ok(&self.estimate.durations)
    }

    /// Total estimated time for the whole waypoint list.
    pub fn estimated_move_duration(&mut self) -> MotorResult<f64> {
        Ok(self.estimated_move_durations()?.iter().sum())
    }
}
