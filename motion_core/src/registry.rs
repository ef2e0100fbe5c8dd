//! Motor registry and pseudomotor chains.
//!
//! [`MotorRegistry`] owns every [`Motor`] of a session in an arena and
//! hands out [`MotorId`]s. Layered motors name the motor beneath them in
//! `real_motor`; the registry resolves those names and walks the chains:
//!
//! | Motor kind   | Towards real                         | From real                     |
//! |--------------|--------------------------------------|-------------------------------|
//! | real         | identity, walk ends                  | identity, walk ends           |
//! | pseudomotor  | own transform, then the next level   | next level, then own transform |
//! | remote motor | own transform, walk ends             | own transform, walk ends      |
//!
//! Walks are iterative. A chain that revisits a motor or grows past
//! `max_chain_depth` fails with `CorruptDataStructure`.

use crate::driver::MotorDriver;
use crate::motor::Motor;
use motion_common::config::MotionConfig;
use motion_common::context::MotionContext;
use motion_common::error::{MotorError, MotorResult};
use motion_common::motor::MotorConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Handle of a motor in a [`MotorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MotorId(usize);

impl MotorId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for MotorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of the motors of one session.
pub struct MotorRegistry {
    motors: Vec<Motor>,
    by_name: HashMap<String, MotorId>,
    ctx: Arc<MotionContext>,
}

impl std::fmt::Debug for MotorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorRegistry")
            .field("motors", &self.motors)
            .finish_non_exhaustive()
    }
}

impl MotorRegistry {
    pub fn new(ctx: Arc<MotionContext>) -> Self {
        Self {
            motors: Vec::new(),
            by_name: HashMap::new(),
            ctx,
        }
    }

    /// Builds every motor of `config`, asking `driver_for` for each
    /// motor's driver.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the config fails validation, or the
    /// first error reported by `driver_for` or [`Motor::new`].
    pub fn from_config<F>(
        config: &MotionConfig,
        ctx: Arc<MotionContext>,
        mut driver_for: F,
    ) -> MotorResult<Self>
    where
        F: FnMut(&MotorConfig) -> MotorResult<Box<dyn MotorDriver>>,
    {
        config
            .validate()
            .map_err(|e| MotorError::IllegalArgument(e.to_string()))?;

        let mut registry = Self::new(ctx);
        for motor_config in &config.motors {
            let driver = driver_for(motor_config)?;
            registry.add(motor_config, driver)?;
        }
        info!(motors = registry.len(), "Motor registry built");
        Ok(registry)
    }

    /// Builds a motor from `config` and adds it.
    pub fn add(&mut self, config: &MotorConfig, driver: Box<dyn MotorDriver>) -> MotorResult<MotorId> {
        let motor = Motor::new(config, driver, self.ctx.clone())?;
        self.insert(motor)
    }

    /// Adds an already built motor.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the name is taken.
    pub fn insert(&mut self, motor: Motor) -> MotorResult<MotorId> {
        if self.by_name.contains_key(motor.name()) {
            return Err(MotorError::IllegalArgument(format!(
                "A motor named '{}' is already registered.",
                motor.name()
            )));
        }
        let id = MotorId(self.motors.len());
        debug!(motor = %motor.name(), driver = motor.driver_name(), %id, "Motor registered");
        self.by_name.insert(motor.name().to_string(), id);
        self.motors.push(motor);
        Ok(id)
    }

    pub fn context(&self) -> &Arc<MotionContext> {
        &self.ctx
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    pub fn id(&self, name: &str) -> Option<MotorId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: MotorId) -> Option<&Motor> {
        self.motors.get(id.0)
    }

    pub fn get_mut(&mut self, id: MotorId) -> Option<&mut Motor> {
        self.motors.get_mut(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&Motor> {
        self.id(name).and_then(|id| self.get(id))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Motor> {
        self.id(name).and_then(|id| self.get_mut(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (MotorId, &Motor)> {
        self.motors.iter().enumerate().map(|(i, m)| (MotorId(i), m))
    }

    /// Mutable borrows of several distinct motors, in `ids` order.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` for an unknown or repeated id.
    pub fn batch_mut(&mut self, ids: &[MotorId]) -> MotorResult<Vec<&mut Motor>> {
        let mut slots: Vec<Option<&mut Motor>> = self.motors.iter_mut().map(Some).collect();
        ids.iter()
            .map(|id| {
                slots.get_mut(id.0).and_then(Option::take).ok_or_else(|| {
                    MotorError::IllegalArgument(format!(
                        "Motor {id} is unknown or listed more than once."
                    ))
                })
            })
            .collect()
    }

    fn motor(&self, id: MotorId) -> MotorResult<&Motor> {
        self.get(id)
            .ok_or_else(|| MotorError::IllegalArgument(format!("Motor {id} is not registered.")))
    }

    /// Motor named as `id`'s `real_motor`.
    fn next_level(&self, id: MotorId) -> MotorResult<MotorId> {
        let motor = self.motor(id)?;
        let name = motor.real_motor_name().ok_or_else(|| {
            MotorError::IllegalArgument(format!(
                "Pseudomotor '{}' does not name a real motor.",
                motor.name()
            ))
        })?;
        self.id(name).ok_or_else(|| {
            MotorError::IllegalArgument(format!(
                "Real motor '{name}' of '{}' is not registered.",
                motor.name()
            ))
        })
    }

    /// Layered motors met walking down from `id`, `id` first.
    ///
    /// The walk follows `real_motor` from pseudomotors. It stops before a
    /// real motor, or after a remote motor when `remote_ends` is set.
    fn chain(&self, id: MotorId, remote_ends: bool) -> MotorResult<Vec<MotorId>> {
        let max_depth = self.ctx.settings().max_chain_depth;
        let mut layers = Vec::new();
        let mut visited = HashSet::new();
        let mut current = id;

        loop {
            let motor = self.motor(current)?;
            let remote = remote_ends && motor.is_remote();
            if !motor.is_pseudomotor() && !remote {
                return Ok(layers);
            }
            if !visited.insert(current) || layers.len() >= max_depth {
                return Err(MotorError::CorruptDataStructure(format!(
                    "The real motor chain of '{}' loops or is deeper than {max_depth} levels.",
                    self.motor(id)?.name()
                )));
            }
            layers.push(current);
            if remote {
                return Ok(layers);
            }
            current = self.next_level(current)?;
        }
    }

    /// Maps a position of `id` to the position of the motor at the
    /// bottom of its chain.
    pub fn pseudomotor_to_real(&self, id: MotorId, position: f64) -> MotorResult<f64> {
        self.chain(id, true)?
            .into_iter()
            .try_fold(position, |value, layer| self.motor(layer)?.transform_to_real(value))
    }

    /// Maps a position of the motor at the bottom of `id`'s chain to a
    /// position of `id`.
    pub fn real_to_pseudomotor(&self, id: MotorId, position: f64) -> MotorResult<f64> {
        self.chain(id, true)?
            .into_iter()
            .rev()
            .try_fold(position, |value, layer| self.motor(layer)?.transform_from_real(value))
    }

    /// The real motor beneath `id`, or `id` itself if it is not a
    /// pseudomotor. Remote motors count as real.
    pub fn real_motor_of(&self, id: MotorId) -> MotorResult<MotorId> {
        let layers = self.chain(id, false)?;
        match layers.last() {
            Some(&last) => self.next_level(last),
            None => Ok(id),
        }
    }

    /// Whether `a` and `b` resolve to the same real motor.
    pub fn can_share_real_motor(&self, a: MotorId, b: MotorId) -> MotorResult<bool> {
        Ok(self.real_motor_of(a)? == self.real_motor_of(b)?)
    }
}
