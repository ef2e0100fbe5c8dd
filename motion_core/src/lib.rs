//! Motion Core Library
//!
//! Hardware-independent motor record. Concrete controllers plug in through
//! the [`driver::MotorDriver`] capability trait; everything above it (moves
//! with backlash, limit checks, status aggregation, waiting, speed and
//! acceleration, home search, move estimates, pseudomotor chains) lives
//! here.
//!
//! # Module Structure
//!
//! - [`driver`] - Capability trait and parameter identifiers
//! - [`parameter`] - Default parameter handlers for drivers
//! - [`state`] - Field values of a motor record
//! - [`motor`] - The [`Motor`] record and its single-motor operations
//! - [`array`] - Moves, waits and aborts over a batch of motors
//! - [`registry`] - Motor arena and pseudomotor chain walks
//! - [`record`] - Field binding with change notification
//!
//! # Usage
//!
//! ```rust,ignore
//! use motion_core::{Motor, MotorRegistry};
//! use motion_common::prelude::*;
//!
//! let mut registry = MotorRegistry::from_config(&config, ctx, |motor| make_driver(motor))?;
//! let theta = registry.id("theta").unwrap();
//! let motor = registry.get_mut(theta).unwrap();
//! motor.move_absolute(12.5, MoveFlags::empty())?;
//! motor.wait_for_motor_stop(MoveFlags::empty())?;
//! ```

pub mod array;
pub mod driver;
pub mod motor;
pub mod parameter;
pub mod record;
pub mod registry;
pub mod state;

pub use driver::{MotorDriver, Parameter, SimultaneousMove};
pub use motor::Motor;
pub use record::MotorRecord;
pub use registry::{MotorId, MotorRegistry};
pub use state::MotorState;
