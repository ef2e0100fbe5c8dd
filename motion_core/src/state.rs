//! Field values of a motor record.
//!
//! [`MotorState`] is what capability slots read and write. A slot reads the
//! inputs it needs (e.g. `raw_destination` for a move) and updates the
//! fields it owns (e.g. `raw_position`, `status`) before returning.
//! Engineering values are recomputed from raw ones by the motor core.

use motion_common::motor::{AccelerationType, HomeSearchType, HomeSwitch, MotorConfig};
use motion_common::status::{MotorFlags, MotorStatus};
use motion_common::units::{MotorSubclass, Raw, Scaling};

/// Servo loop gains. Drivers without gain support leave them at 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServoGains {
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub velocity_feedforward: f64,
    pub acceleration_feedforward: f64,
    pub integral_limit: f64,
    pub extra: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotorState {
    pub name: String,
    pub subclass: MotorSubclass,
    pub units: String,
    pub flags: MotorFlags,
    pub scaling: Scaling,

    // ─── Positions ──────────────────────────────────────────────────
    pub raw_position: Raw,
    pub position: f64,
    pub raw_destination: Raw,
    pub destination: f64,
    /// Destination before the most recent move, for undo.
    pub old_destination: f64,
    pub raw_set_position: Raw,
    pub set_position: f64,

    // ─── Limits, backlash, deadband ─────────────────────────────────
    pub raw_positive_limit: Raw,
    pub positive_limit: f64,
    pub raw_negative_limit: Raw,
    pub negative_limit: f64,
    pub raw_backlash_correction: Raw,
    pub backlash_correction: f64,
    pub raw_move_deadband: Raw,
    pub move_deadband: f64,

    // ─── Status ─────────────────────────────────────────────────────
    pub status: MotorStatus,
    /// Latched bits, OR-ed into every status read until cleared.
    pub latched_status: MotorStatus,
    pub busy: bool,
    pub positive_limit_hit: bool,
    pub negative_limit_hit: bool,
    pub extended_status: String,
    pub backlash_move_in_progress: bool,
    pub home_search_in_progress: bool,

    // ─── Speed & acceleration (raw units) ───────────────────────────
    pub raw_speed: f64,
    pub raw_base_speed: f64,
    pub raw_maximum_speed: f64,
    pub raw_saved_speed: f64,
    pub raw_maximum_speed_limit: f64,
    pub raw_minimum_speed_limit: f64,
    pub speed: f64,
    pub base_speed: f64,
    pub maximum_speed: f64,
    pub acceleration_type: AccelerationType,
    pub raw_acceleration_parameters: [f64; 4],
    pub acceleration_time: f64,
    pub raw_acceleration_distance: f64,
    pub acceleration_distance: f64,
    pub synchronous_motion_mode: bool,
    pub saved_synchronous_motion_mode: bool,
    pub gains: ServoGains,

    // ─── Home search & direct commands ──────────────────────────────
    pub home_search_type: HomeSearchType,
    pub home_switch: HomeSwitch,
    /// Binding to restore once a `NOWAIT` limit-as-home search stops.
    pub pending_home_switch: Option<HomeSwitch>,
    /// Signed raw direction for the driver home command.
    pub home_search_direction: i32,
    /// Signed raw direction for constant-velocity moves.
    pub constant_velocity_direction: i32,
    pub axis_enable: bool,
    pub closed_loop: bool,
    pub fault_reset: bool,

    // ─── Start positions ────────────────────────────────────────────
    pub raw_saved_start_position: f64,
    pub use_start_positions: bool,
}

impl MotorState {
    /// Neutral state built from `config`, with engineering values derived from raw.
    pub fn from_config(config: &MotorConfig) -> Self {
        let subclass = config.subclass;
        let raw = |value: f64| Raw::from_f64(subclass, value);
        let mut state = Self {
            name: config.name.clone(),
            subclass,
            units: config.units.clone(),
            flags: config.flags(),
            scaling: Scaling::new(config.scale, config.offset),
            raw_position: Raw::zero(subclass),
            position: 0.0,
            raw_destination: Raw::zero(subclass),
            destination: 0.0,
            old_destination: 0.0,
            raw_set_position: Raw::zero(subclass),
            set_position: 0.0,
            raw_positive_limit: raw(config.raw_positive_limit),
            positive_limit: 0.0,
            raw_negative_limit: raw(config.raw_negative_limit),
            negative_limit: 0.0,
            raw_backlash_correction: raw(config.raw_backlash_correction),
            backlash_correction: 0.0,
            raw_move_deadband: raw(config.raw_move_deadband),
            move_deadband: 0.0,
            status: MotorStatus::empty(),
            latched_status: MotorStatus::empty(),
            busy: false,
            positive_limit_hit: false,
            negative_limit_hit: false,
            extended_status: String::new(),
            backlash_move_in_progress: false,
            home_search_in_progress: false,
            raw_speed: config.raw_speed,
            raw_base_speed: config.raw_base_speed,
            raw_maximum_speed: config.raw_maximum_speed,
            raw_saved_speed: config.raw_speed,
            raw_maximum_speed_limit: config.raw_maximum_speed_limit,
            raw_minimum_speed_limit: config.raw_minimum_speed_limit,
            speed: 0.0,
            base_speed: 0.0,
            maximum_speed: 0.0,
            acceleration_type: config.acceleration_type,
            raw_acceleration_parameters: config.raw_acceleration_parameters,
            acceleration_time: 0.0,
            raw_acceleration_distance: 0.0,
            acceleration_distance: 0.0,
            synchronous_motion_mode: false,
            saved_synchronous_motion_mode: false,
            gains: ServoGains::default(),
            home_search_type: config.home_search,
            home_switch: config.home_switch,
            pending_home_switch: None,
            home_search_direction: 0,
            constant_velocity_direction: 0,
            axis_enable: true,
            closed_loop: true,
            fault_reset: false,
            raw_saved_start_position: 0.0,
            use_start_positions: false,
        };
        state.refresh_engineering_values();
        state.destination = state.position;
        state.old_destination = state.position;
        state.set_position = state.position;
        state.raw_destination = state.raw_position;
        state.raw_set_position = state.raw_position;
        state
    }

    /// Recomputes every engineering field from its raw counterpart.
    pub fn refresh_engineering_values(&mut self) {
        let s = self.scaling;
        self.position = s.to_engineering(self.raw_position);
        self.destination = s.to_engineering(self.raw_destination);
        self.set_position = s.to_engineering(self.raw_set_position);
        self.positive_limit = s.to_engineering(self.raw_positive_limit);
        self.negative_limit = s.to_engineering(self.raw_negative_limit);
        self.backlash_correction = s.distance_to_engineering(self.raw_backlash_correction);
        self.move_deadband = s.distance_to_engineering(self.raw_move_deadband);
        self.refresh_speeds();
    }

    /// Engineering speeds from raw speeds. Speeds are never negative.
    pub fn refresh_speeds(&mut self) {
        let factor = self.scaling.scale.abs();
        self.speed = factor * self.raw_speed;
        self.base_speed = factor * self.raw_base_speed;
        self.maximum_speed = factor * self.raw_maximum_speed;
    }

    /// Recomputes `position` from `raw_position`.
    pub fn refresh_position(&mut self) {
        self.position = self.scaling.to_engineering(self.raw_position);
    }

    /// Converts an engineering position to this motor's raw form.
    pub fn to_raw(&self, engineering: f64) -> Raw {
        self.scaling.to_raw(self.subclass, engineering)
    }

    pub fn is_pseudomotor(&self) -> bool {
        self.flags.contains(MotorFlags::IS_PSEUDOMOTOR)
    }

    pub fn is_remote(&self) -> bool {
        self.flags.contains(MotorFlags::IS_REMOTE_MOTOR)
    }

    /// Suffix for messages quoting raw analog values: the engineering
    /// units when raw and engineering values coincide, otherwise nothing.
    pub fn raw_units_suffix(&self) -> String {
        if self.scaling.raw_matches_engineering() && !self.units.is_empty() {
            format!(" {}", self.units)
        } else {
            String::new()
        }
    }
}
