//! Simulated axis kinematics.
//!
//! An axis moves at constant speed with instant acceleration. Time only
//! advances when [`SimAxis::update`] is called with a later tick, so a
//! [`ManualClock`](motion_common::clock::ManualClock) makes every motion
//! reproducible.
//!
//! Positions are tracked physically. The reported position is the
//! physical one minus an origin, which `set_position` and a successful
//! home search move. Limit and home switches sit at fixed physical
//! positions.
//!
//! | Motion          | Ends when                                           |
//! |-----------------|-----------------------------------------------------|
//! | `Positioning`   | target reached, or a limit switch in the way trips  |
//! | `Jog`           | the limit switch in its direction trips             |
//! | `HomeSearch`    | the bound home switch is reached                    |

use crate::config::SimAxisConfig;
use motion_common::clock::{Tick, duration_from_secs};
use motion_common::error::{MotorError, MotorResult};
use motion_common::motor::HomeSwitch;
use motion_common::status::MotorStatus;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Distance under which two physical positions count as equal.
const POSITION_EPSILON: f64 = 1.0e-9;

/// What the axis is doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Idle,
    /// Travelling to a physical target.
    Positioning { target: f64 },
    /// Travelling until the limit switch in `direction`.
    Jog { direction: f64 },
    /// Looking for `switch`, reversing once at a limit if it lies behind.
    HomeSearch {
        direction: f64,
        switch: HomeSwitch,
        reversed: bool,
    },
}

#[derive(Debug)]
pub struct SimAxis {
    config: SimAxisConfig,
    physical: f64,
    origin: f64,
    speed: f64,
    motion: Motion,
    motion_start: Tick,
    latency: Duration,
    last_update: Tick,
    faults: MotorStatus,
    enabled: bool,
    closed_loop: bool,
    jammed: bool,
    homed: bool,
    home_switch: HomeSwitch,
    acceleration_parameters: [f64; 4],
    synchronous_motion_mode: bool,
    /// Reported targets of every positioning command, in order.
    commanded: Vec<f64>,
    failing: HashSet<&'static str>,
    fail_once: HashSet<&'static str>,
}

impl SimAxis {
    pub fn new(config: SimAxisConfig, now: Tick) -> Self {
        Self {
            physical: config.initial_position,
            origin: 0.0,
            speed: config.speed,
            motion: Motion::Idle,
            motion_start: now,
            latency: duration_from_secs(config.start_latency),
            last_update: now,
            faults: MotorStatus::empty(),
            enabled: true,
            closed_loop: true,
            jammed: false,
            homed: false,
            home_switch: HomeSwitch::HomeInput,
            acceleration_parameters: [0.0; 4],
            synchronous_motion_mode: false,
            commanded: Vec::new(),
            failing: HashSet::new(),
            fail_once: HashSet::new(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SimAxisConfig {
        &self.config
    }

    /// Reported position.
    pub fn position(&self) -> f64 {
        self.physical - self.origin
    }

    pub fn physical_position(&self) -> f64 {
        self.physical
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn commanded(&self) -> &[f64] {
        &self.commanded
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    // ─── Time ───────────────────────────────────────────────────────

    /// Advances the axis to `now`.
    pub fn update(&mut self, now: Tick) {
        if self.motion != Motion::Idle {
            let begin = self.last_update.max(self.motion_start + self.latency);
            if now > begin {
                self.advance(now.saturating_since(begin).as_secs_f64());
            }
        }
        self.last_update = self.last_update.max(now);
    }

    fn advance(&mut self, mut seconds: f64) {
        if self.jammed {
            return;
        }
        // Each pass either consumes all the time or changes the motion.
        for _ in 0..4 {
            if self.motion == Motion::Idle || seconds <= 0.0 {
                return;
            }
            let reach = self.speed * seconds;
            match self.goal() {
                Some(goal) => {
                    let distance = (goal - self.physical).abs();
                    if reach < distance {
                        self.physical += reach * (goal - self.physical).signum();
                        return;
                    }
                    seconds -= distance / self.speed;
                    self.physical = goal;
                    self.arrive();
                }
                None => match self.motion {
                    Motion::Jog { direction } => {
                        self.physical += direction * reach;
                        return;
                    }
                    _ => self.arrive(),
                },
            }
        }
    }

    /// Physical point the current motion heads for. `None` for an
    /// unbounded jog, or a home search with nothing ahead.
    fn goal(&self) -> Option<f64> {
        match self.motion {
            Motion::Idle => Some(self.physical),
            Motion::Positioning { target } => {
                let direction = (target - self.physical).signum();
                Some(match self.limit_switch(direction) {
                    Some(limit) if direction > 0.0 => target.min(limit),
                    Some(limit) if direction < 0.0 => target.max(limit),
                    _ => target,
                })
            }
            Motion::Jog { direction } => self.limit_switch(direction),
            Motion::HomeSearch {
                direction, switch, ..
            } => {
                let home = self.switch_position(switch)?;
                let ahead = (home - self.physical) * direction >= -POSITION_EPSILON;
                if ahead {
                    Some(home)
                } else {
                    self.limit_switch(direction)
                }
            }
        }
    }

    fn arrive(&mut self) {
        match self.motion {
            Motion::HomeSearch {
                direction,
                switch,
                reversed,
            } => {
                let on_switch = self
                    .switch_position(switch)
                    .is_some_and(|home| (home - self.physical).abs() < POSITION_EPSILON);
                if on_switch {
                    self.origin = self.physical;
                    self.homed = true;
                    self.motion = Motion::Idle;
                    debug!(axis = %self.config.name, "Home switch found");
                } else if !reversed {
                    self.motion = Motion::HomeSearch {
                        direction: -direction,
                        switch,
                        reversed: true,
                    };
                    trace!(axis = %self.config.name, "Home search reversing");
                } else {
                    self.motion = Motion::Idle;
                    warn!(axis = %self.config.name, ?switch, "Home switch not found");
                }
            }
            _ => self.motion = Motion::Idle,
        }
    }

    fn limit_switch(&self, direction: f64) -> Option<f64> {
        if direction > 0.0 {
            self.config.positive_limit_switch
        } else if direction < 0.0 {
            self.config.negative_limit_switch
        } else {
            None
        }
    }

    fn switch_position(&self, switch: HomeSwitch) -> Option<f64> {
        match switch {
            HomeSwitch::HomeInput => Some(self.config.home_switch),
            HomeSwitch::PositiveLimit => self.config.positive_limit_switch,
            HomeSwitch::NegativeLimit => self.config.negative_limit_switch,
        }
    }

    // ─── Status ─────────────────────────────────────────────────────

    /// Status word as of the last update.
    pub fn status(&self) -> MotorStatus {
        let mut status = self.faults;
        let started = self.last_update >= self.motion_start + self.latency;
        status.set(MotorStatus::BUSY, self.motion != Motion::Idle && started);
        let at = |limit: Option<f64>, beyond: fn(f64, f64) -> bool| {
            limit.is_some_and(|limit| beyond(self.physical, limit))
        };
        status.set(
            MotorStatus::POSITIVE_LIMIT_HIT,
            at(self.config.positive_limit_switch, |p, l| p >= l - POSITION_EPSILON),
        );
        status.set(
            MotorStatus::NEGATIVE_LIMIT_HIT,
            at(self.config.negative_limit_switch, |p, l| p <= l + POSITION_EPSILON),
        );
        status.set(MotorStatus::AXIS_DISABLED, !self.enabled);
        status.set(MotorStatus::OPEN_LOOP, !self.closed_loop);
        status
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Starts a move to the reported position `target`.
    pub fn start_move(&mut self, target: f64, now: Tick) -> MotorResult<()> {
        self.commanded.push(target);
        self.start(
            Motion::Positioning {
                target: target + self.origin,
            },
            now,
        )
    }

    /// Starts an unbounded move in the sign of `direction`.
    pub fn start_jog(&mut self, direction: i32, now: Tick) -> MotorResult<()> {
        let direction = sign(direction);
        self.start(Motion::Jog { direction }, now)
    }

    /// Starts a home search for `switch` in the sign of `direction`.
    pub fn start_home_search(
        &mut self,
        direction: i32,
        switch: HomeSwitch,
        now: Tick,
    ) -> MotorResult<()> {
        self.homed = false;
        self.start(
            Motion::HomeSearch {
                direction: sign(direction),
                switch,
                reversed: false,
            },
            now,
        )
    }

    fn start(&mut self, motion: Motion, now: Tick) -> MotorResult<()> {
        self.update(now);
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(MotorError::DeviceActionFailed(format!(
                "Axis '{}' cannot move at speed {}.",
                self.config.name, self.speed
            )));
        }
        if !self.enabled || !self.faults.is_empty() {
            debug!(axis = %self.config.name, ?motion, "Motion command ignored");
            return Ok(());
        }
        trace!(axis = %self.config.name, ?motion, "Motion started");
        self.motion = motion;
        self.motion_start = now;
        self.last_update = now;
        Ok(())
    }

    /// Stops at the current position.
    pub fn stop(&mut self, now: Tick) {
        self.update(now);
        self.motion = Motion::Idle;
    }

    /// Makes the current position read as `position`.
    pub fn set_position(&mut self, position: f64) {
        self.origin = self.physical - position;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64, now: Tick) {
        self.update(now);
        self.speed = speed;
    }

    pub fn maximum_speed(&self) -> f64 {
        self.config.maximum_speed
    }

    pub fn acceleration_parameters(&self) -> [f64; 4] {
        self.acceleration_parameters
    }

    pub fn set_acceleration_parameters(&mut self, parameters: [f64; 4]) {
        self.acceleration_parameters = parameters;
    }

    pub fn home_switch(&self) -> HomeSwitch {
        self.home_switch
    }

    pub fn set_home_switch(&mut self, switch: HomeSwitch) {
        self.home_switch = switch;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling stops the axis.
    pub fn set_enabled(&mut self, enabled: bool, now: Tick) {
        if !enabled {
            self.stop(now);
        }
        self.enabled = enabled;
    }

    pub fn is_closed_loop(&self) -> bool {
        self.closed_loop
    }

    pub fn set_closed_loop(&mut self, closed_loop: bool) {
        self.closed_loop = closed_loop;
    }

    pub fn synchronous_motion_mode(&self) -> bool {
        self.synchronous_motion_mode
    }

    pub fn set_synchronous_motion_mode(&mut self, enabled: bool) {
        self.synchronous_motion_mode = enabled;
    }

    // ─── Fault Injection ────────────────────────────────────────────

    /// Raises fault bits and stops the axis.
    pub fn inject_fault(&mut self, bits: MotorStatus, now: Tick) {
        self.stop(now);
        self.faults |= bits;
        debug!(axis = %self.config.name, faults = ?self.faults, "Fault injected");
    }

    pub fn clear_faults(&mut self) {
        self.faults = MotorStatus::empty();
    }

    /// A jammed axis accepts commands and reports busy but does not move.
    pub fn set_jammed(&mut self, jammed: bool) {
        self.jammed = jammed;
    }

    /// Makes every call of driver slot `slot` fail.
    pub fn fail_slot(&mut self, slot: &'static str) {
        self.failing.insert(slot);
    }

    /// Makes the next call of driver slot `slot` fail.
    pub fn fail_next(&mut self, slot: &'static str) {
        self.fail_once.insert(slot);
    }

    pub fn clear_slot_failures(&mut self) {
        self.failing.clear();
        self.fail_once.clear();
    }

    /// Consumes an injected failure for `slot`, if any.
    pub fn check_slot(&mut self, slot: &'static str) -> MotorResult<()> {
        if self.failing.contains(slot) || self.fail_once.remove(slot) {
            return Err(MotorError::DeviceIo(format!(
                "Simulated {slot} failure on axis '{}'.",
                self.config.name
            )));
        }
        Ok(())
    }

    // ─── Persistence ────────────────────────────────────────────────

    /// Restores a saved reported position and home state, keeping the
    /// physical position.
    pub fn restore(&mut self, position: f64, homed: bool) {
        self.set_position(position);
        self.homed = homed;
    }
}

fn sign(direction: i32) -> f64 {
    if direction >= 0 { 1.0 } else { -1.0 }
}
