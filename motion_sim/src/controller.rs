//! Simulated multi-axis controller.
//!
//! A [`SimController`] is a cheap, cloneable handle on a set of
//! [`SimAxis`]es sharing one clock. Every access first advances the axis
//! to the clock's current tick. Drivers hold a handle plus an axis index;
//! tests keep another handle to inspect axes and inject faults.

use crate::axis::SimAxis;
use crate::config::{SimAxisConfig, SimConfig};
use crate::state::{PersistedAxisState, PersistedState};
use motion_common::clock::{Clock, Tick};
use motion_common::error::{MotorError, MotorResult};
use motion_common::status::MotorStatus;
use motion_core::driver::SimultaneousMove;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

struct Axes {
    list: Vec<SimAxis>,
    by_name: HashMap<String, usize>,
}

#[derive(Clone)]
pub struct SimController {
    clock: Arc<dyn Clock>,
    axes: Arc<Mutex<Axes>>,
}

impl std::fmt::Debug for SimController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimController").finish_non_exhaustive()
    }
}

impl SimController {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            axes: Arc::new(Mutex::new(Axes {
                list: Vec::new(),
                by_name: HashMap::new(),
            })),
        }
    }

    /// Controller with every axis of `config`.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if `config` fails validation.
    pub fn from_config(config: &SimConfig, clock: Arc<dyn Clock>) -> MotorResult<Self> {
        config
            .validate()
            .map_err(|e| MotorError::IllegalArgument(e.to_string()))?;
        let controller = Self::new(clock);
        for axis in &config.axes {
            controller.add_axis(axis.clone())?;
        }
        info!(axes = config.axes.len(), "Simulated controller ready");
        Ok(controller)
    }

    fn lock(&self) -> MotorResult<MutexGuard<'_, Axes>> {
        self.axes.lock().map_err(|_| {
            MotorError::CorruptDataStructure("Simulated controller lock is poisoned.".to_string())
        })
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Adds an axis and returns its index.
    pub fn add_axis(&self, config: SimAxisConfig) -> MotorResult<usize> {
        config
            .validate()
            .map_err(|e| MotorError::IllegalArgument(e.to_string()))?;
        let now = self.now();
        let mut axes = self.lock()?;
        if axes.by_name.contains_key(&config.name) {
            return Err(MotorError::IllegalArgument(format!(
                "Axis '{}' already exists.",
                config.name
            )));
        }
        let index = axes.list.len();
        axes.by_name.insert(config.name.clone(), index);
        debug!(axis = %config.name, index, "Axis added");
        axes.list.push(SimAxis::new(config, now));
        Ok(index)
    }

    pub fn axis_index(&self, name: &str) -> MotorResult<usize> {
        self.lock()?.by_name.get(name).copied().ok_or_else(|| {
            MotorError::IllegalArgument(format!("No simulated axis named '{name}'."))
        })
    }

    pub fn axis_count(&self) -> usize {
        self.lock().map(|axes| axes.list.len()).unwrap_or(0)
    }

    /// Runs `op` on axis `index`, brought up to the current tick.
    pub fn with_axis<R>(
        &self,
        index: usize,
        op: impl FnOnce(&mut SimAxis, Tick) -> MotorResult<R>,
    ) -> MotorResult<R> {
        let now = self.now();
        let mut axes = self.lock()?;
        let axis = axes.list.get_mut(index).ok_or_else(|| {
            MotorError::CorruptDataStructure(format!("Simulated axis index {index} is out of range."))
        })?;
        axis.update(now);
        op(axis, now)
    }

    /// Like [`with_axis`](Self::with_axis), by name.
    pub fn with_named<R>(
        &self,
        name: &str,
        op: impl FnOnce(&mut SimAxis, Tick) -> MotorResult<R>,
    ) -> MotorResult<R> {
        let index = self.axis_index(name)?;
        self.with_axis(index, op)
    }

    // ─── Inspection ─────────────────────────────────────────────────

    pub fn position(&self, name: &str) -> MotorResult<f64> {
        self.with_named(name, |axis, _| Ok(axis.position()))
    }

    pub fn status(&self, name: &str) -> MotorResult<MotorStatus> {
        self.with_named(name, |axis, _| Ok(axis.status()))
    }

    /// Reported targets of every move commanded on `name`.
    pub fn commanded(&self, name: &str) -> MotorResult<Vec<f64>> {
        self.with_named(name, |axis, _| Ok(axis.commanded().to_vec()))
    }

    // ─── Fault Injection ────────────────────────────────────────────

    pub fn inject_fault(&self, name: &str, bits: MotorStatus) -> MotorResult<()> {
        self.with_named(name, |axis, now| {
            axis.inject_fault(bits, now);
            Ok(())
        })
    }

    pub fn set_jammed(&self, name: &str, jammed: bool) -> MotorResult<()> {
        self.with_named(name, |axis, _| {
            axis.set_jammed(jammed);
            Ok(())
        })
    }

    pub fn fail_slot(&self, name: &str, slot: &'static str) -> MotorResult<()> {
        self.with_named(name, |axis, _| {
            axis.fail_slot(slot);
            Ok(())
        })
    }

    pub fn fail_next(&self, name: &str, slot: &'static str) -> MotorResult<()> {
        self.with_named(name, |axis, _| {
            axis.fail_next(slot);
            Ok(())
        })
    }

    // ─── Simultaneous Start ─────────────────────────────────────────

    /// Starts every listed axis at the same tick. Nothing starts if any
    /// axis is unknown.
    pub fn simultaneous_start(&self, moves: &[SimultaneousMove]) -> MotorResult<()> {
        let now = self.now();
        let mut axes = self.lock()?;
        let indices = moves
            .iter()
            .map(|m| {
                axes.by_name.get(&m.motor).copied().ok_or_else(|| {
                    MotorError::IllegalArgument(format!(
                        "No simulated axis named '{}' for a simultaneous start.",
                        m.motor
                    ))
                })
            })
            .collect::<MotorResult<Vec<_>>>()?;

        for (index, m) in indices.into_iter().zip(moves) {
            let axis = &mut axes.list[index];
            axis.update(now);
            axis.start_move(m.raw_destination.as_f64(), now)?;
        }
        debug!(axes = moves.len(), "Simultaneous start");
        Ok(())
    }

    // ─── Persistence ────────────────────────────────────────────────

    pub fn snapshot(&self) -> MotorResult<PersistedState> {
        let now = self.now();
        let mut axes = self.lock()?;
        let saved = axes
            .list
            .iter_mut()
            .map(|axis| {
                axis.update(now);
                PersistedAxisState {
                    name: axis.name().to_string(),
                    position: axis.position(),
                    homed: axis.is_homed(),
                }
            })
            .collect();
        Ok(PersistedState::new(saved))
    }

    /// Applies saved positions to axes of the same name. Returns how many
    /// axes were restored.
    pub fn restore(&self, state: &PersistedState) -> MotorResult<usize> {
        let mut axes = self.lock()?;
        let mut restored = 0;
        for saved in &state.axes {
            let Some(&index) = axes.by_name.get(&saved.name) else {
                debug!(axis = %saved.name, "No axis for saved state");
                continue;
            };
            axes.list[index].restore(saved.position, saved.homed);
            restored += 1;
        }
        info!(restored, "Restored axis state");
        Ok(restored)
    }
}
