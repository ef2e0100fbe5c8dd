//! Shared rig for the simulation scenarios.

#![allow(dead_code)]

use motion_common::clock::ManualClock;
use motion_common::config::MotionSettings;
use motion_common::context::MotionContext;
use motion_common::interrupt::{InterruptPoller, NoInterrupts};
use motion_common::motor::MotorConfig;
use motion_common::units::MotorSubclass;
use motion_core::motor::Motor;
use motion_sim::{Capabilities, SimAxisConfig, SimController, SimMotorDriver};
use std::sync::Arc;
use std::time::Duration;

/// A manual clock shared by the motion context and a simulated controller.
pub struct Rig {
    pub clock: Arc<ManualClock>,
    pub ctx: Arc<MotionContext>,
    pub controller: SimController,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_interrupts(Box::new(NoInterrupts))
    }

    pub fn with_interrupts(interrupts: Box<dyn InterruptPoller>) -> Self {
        let clock = Arc::new(ManualClock::new());
        let ctx = Arc::new(MotionContext::new(
            MotionSettings::default(),
            clock.clone(),
            interrupts,
        ));
        let controller = SimController::new(clock.clone());
        Self {
            clock,
            ctx,
            controller,
        }
    }

    pub fn axis(&self, config: SimAxisConfig) -> &Self {
        self.controller.add_axis(config).unwrap();
        self
    }

    pub fn motor(&self, config: &MotorConfig) -> Motor {
        motion_sim::motor_on_axis(config, &self.controller, self.ctx.clone()).unwrap()
    }

    pub fn masked_motor(&self, config: &MotorConfig, masked: Capabilities) -> Motor {
        let driver = SimMotorDriver::new(&self.controller, &config.name)
            .unwrap()
            .without(masked);
        Motor::new(config, Box::new(driver), self.ctx.clone()).unwrap()
    }

    pub fn advance(&self, seconds: f64) {
        self.clock.advance(Duration::from_secs_f64(seconds));
    }

    pub fn elapsed(&self) -> f64 {
        self.ctx.now().as_secs_f64()
    }
}

pub fn stepper(name: &str) -> MotorConfig {
    MotorConfig::new(name, MotorSubclass::Stepper)
}

pub fn analog(name: &str) -> MotorConfig {
    MotorConfig::new(name, MotorSubclass::Analog)
}

/// Axis with limit switches at ±50.
pub fn limited(name: &str) -> SimAxisConfig {
    SimAxisConfig::new(name).with_limit_switches(-50.0, 50.0)
}
