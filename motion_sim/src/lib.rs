//! Motion Simulation Library
//!
//! A deterministic stand-in for a motor controller. Axes move at constant
//! speed against limit and home switches, on whatever clock the session
//! uses, so a [`ManualClock`](motion_common::clock::ManualClock) turns
//! every wait loop into a reproducible sequence.
//!
//! # Module Structure
//!
//! - [`config`] - Simulated axis configuration
//! - [`axis`] - Axis kinematics, switches and fault injection
//! - [`controller`] - Shared multi-axis controller handle
//! - [`driver`] - [`MotorDriver`](motion_core::driver::MotorDriver) over one axis, with capability masking
//! - [`pseudomotor`] - Linear pseudomotor
//! - [`state`] - Axis state persistence
//!
//! # Usage
//!
//! ```rust,ignore
//! let controller = SimController::from_config(&sim_config, ctx.clock().clone())?;
//! let mut registry = MotorRegistry::from_config(&config, ctx, |motor| {
//!     Ok(Box::new(SimMotorDriver::new(&controller, &motor.name)?) as Box<dyn MotorDriver>)
//! })?;
//! ```

pub mod axis;
pub mod config;
pub mod controller;
pub mod driver;
pub mod pseudomotor;
pub mod state;

pub use config::{SimAxisConfig, SimConfig};
pub use controller::SimController;
pub use driver::{Capabilities, SimMotorDriver};
pub use pseudomotor::LinearPseudomotor;

use motion_common::context::MotionContext;
use motion_common::error::MotorResult;
use motion_common::motor::MotorConfig;
use motion_core::motor::Motor;
use std::sync::Arc;

/// Motor record driving the axis of the same name.
pub fn motor_on_axis(
    config: &MotorConfig,
    controller: &SimController,
    ctx: Arc<MotionContext>,
) -> MotorResult<Motor> {
    let driver = SimMotorDriver::new(controller, &config.name)?;
    Motor::new(config, Box::new(driver), ctx)
}
