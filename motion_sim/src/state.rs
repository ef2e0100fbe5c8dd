//! Axis state persistence.
//!
//! Reported positions and home state survive a restart of the simulated
//! controller through a JSON file.

use motion_common::error::{MotorError, MotorResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Saved state of one axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedAxisState {
    /// Axis name, matched on load.
    pub name: String,
    /// Reported position.
    pub position: f64,
    pub homed: bool,
}

/// Saved state of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub axes: Vec<PersistedAxisState>,
}

impl PersistedState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(axes: Vec<PersistedAxisState>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            axes,
        }
    }
}

/// Reads and writes a [`PersistedState`] file.
#[derive(Debug, Clone)]
pub struct StatePersistence {
    path: PathBuf,
}

impl StatePersistence {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, state: &PersistedState) -> MotorResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MotorError::DeviceIo(format!("Failed to create state directory: {e}"))
            })?;
        }
        let file = File::create(&self.path)
            .map_err(|e| MotorError::DeviceIo(format!("Failed to create state file: {e}")))?;
        serde_json::to_writer_pretty(BufWriter::new(file), state)
            .map_err(|e| MotorError::DeviceIo(format!("Failed to serialize state: {e}")))?;
        info!(axes = state.axes.len(), path = ?self.path, "Saved axis state");
        Ok(())
    }

    /// Loads the saved state. A missing file or a file of another format
    /// version yields `None`.
    pub fn load(&self) -> MotorResult<Option<PersistedState>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No saved axis state");
            return Ok(None);
        }
        let file = File::open(&self.path)
            .map_err(|e| MotorError::DeviceIo(format!("Failed to open state file: {e}")))?;
        let state: PersistedState = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MotorError::DeviceIo(format!("Failed to deserialize state: {e}")))?;

        if state.version != PersistedState::CURRENT_VERSION {
            warn!(
                found = state.version,
                expected = PersistedState::CURRENT_VERSION,
                "Saved axis state has another version, ignoring it"
            );
            return Ok(None);
        }
        Ok(Some(state))
    }

    pub fn delete(&self) -> MotorResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| MotorError::DeviceIo(format!("Failed to delete state file: {e}")))?;
        }
        Ok(())
    }
}
