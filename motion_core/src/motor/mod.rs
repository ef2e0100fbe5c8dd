//! Motor record.
//!
//! A [`Motor`] couples the record's field values ([`MotorState`]) with a
//! concrete [`MotorDriver`] and the session's [`MotionContext`]. All
//! motion-core operations are methods on it, split by concern:
//!
//! | Module      | Operations                                               |
//! |-------------|----------------------------------------------------------|
//! | `position`  | get/set position, steps to go, start positions           |
//! | `status`    | status aggregation, busy, limit hits, aborts, busy start |
//! | `limits`    | software limit classification and checks                 |
//! | `moves`     | absolute/relative moves with backlash, direct commands   |
//! | `wait`      | cooperative wait for a single motor                      |
//! | `speed`     | speed, base speed, acceleration, gains                   |
//! | `home`      | home-search strategies                                   |
//! | `estimate`  | estimated move durations                                 |

mod estimate;
mod home;
mod limits;
mod moves;
mod position;
mod speed;
mod status;
mod wait;

pub use estimate::{MoveEstimate, segment_duration};
pub use limits::LimitClass;
pub use moves::{ControlCommand, MoveOutcome};
pub use speed::{Gain, SpeedKind};

pub(crate) use wait::{error_mask, warn_conditions};

use crate::driver::MotorDriver;
use crate::state::MotorState;
use motion_common::clock::{Tick, duration_from_secs};
use motion_common::context::MotionContext;
use motion_common::error::{MotorError, MotorResult};
use motion_common::motor::MotorConfig;
use motion_common::units::MotorSubclass;
use std::sync::Arc;
use std::time::Duration;

/// A motor record bound to its driver.
pub struct Motor {
    state: MotorState,
    driver: Box<dyn MotorDriver>,
    ctx: Arc<MotionContext>,
    real_motor: Option<String>,
    busy_start_interval: Option<Duration>,
    last_move_start: Option<Tick>,
    estimate: MoveEstimate,
}

impl std::fmt::Debug for Motor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Motor")
            .field("name", &self.state.name)
            .field("driver", &self.driver.name())
            .field("subclass", &self.state.subclass)
            .field("real_motor", &self.real_motor)
            .finish_non_exhaustive()
    }
}

impl Motor {
    /// Builds a motor record from `config`.
    ///
    /// Engineering values are derived from the configured raw values and
    /// destination and set position start at the current position. No
    /// driver slot is called.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if `config` fails validation.
    pub fn new(
        config: &MotorConfig,
        driver: Box<dyn MotorDriver>,
        ctx: Arc<MotionContext>,
    ) -> MotorResult<Self> {
        config
            .validate()
            .map_err(|e| MotorError::IllegalArgument(e.to_string()))?;

        let mut motor = Self {
            state: MotorState::from_config(config),
            driver,
            ctx,
            real_motor: config.real_motor.clone(),
            busy_start_interval: None,
            last_move_start: None,
            estimate: MoveEstimate::default(),
        };
        motor.set_busy_start_interval(config.busy_start_interval);
        Ok(motor)
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn subclass(&self) -> MotorSubclass {
        self.state.subclass
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Current field values, as of the last operation.
    pub fn state(&self) -> &MotorState {
        &self.state
    }

    pub fn context(&self) -> &Arc<MotionContext> {
        &self.ctx
    }

    /// Name of the motor this one is layered on, if any.
    pub fn real_motor_name(&self) -> Option<&str> {
        self.real_motor.as_deref()
    }

    pub fn is_pseudomotor(&self) -> bool {
        self.state.is_pseudomotor()
    }

    pub fn is_remote(&self) -> bool {
        self.state.is_remote()
    }

    // ─── Busy Start Interval ────────────────────────────────────────

    /// Sets the busy-start window in seconds. Zero or negative disables it.
    pub fn set_busy_start_interval(&mut self, seconds: f64) {
        self.busy_start_interval = (seconds > 0.0).then(|| duration_from_secs(seconds));
    }

    /// Busy-start window in seconds, or `None` when disabled.
    pub fn busy_start_interval(&self) -> Option<f64> {
        self.busy_start_interval.map(|d| d.as_secs_f64())
    }

    /// Whether the motor is still inside the busy-start window of its
    /// last move command.
    pub fn check_busy_start_interval(&self) -> bool {
        match (self.busy_start_interval, self.last_move_start) {
            (Some(interval), Some(start)) => self.ctx.now() < start + interval,
            _ => false,
        }
    }

    /// Records the start of a move command and clears latched bits.
    fn begin_command(&mut self) {
        self.last_move_start = Some(self.ctx.now());
        self.clear_latched_status();
    }
}

/// Resolves an optional slot result, treating absence as `Unsupported`.
pub(crate) fn required<T>(
    slot: Option<MotorResult<T>>,
    motor: &str,
    operation: &str,
) -> MotorResult<T> {
    slot.unwrap_or_else(|| Err(MotorError::unsupported(motor, operation)))
}

#[cfg(test)]
pub(crate) mod testing;
