//! Prelude module for common re-exports.
//!
//! ```rust
//! use motion_common::prelude::*;
//! ```

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{ErrorKind, MotorError, MotorResult};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, MotionConfig, MotionSettings};
pub use crate::motor::{AccelerationType, HomeSearchType, HomeSwitch, MotorConfig};

// ─── Status & Units ─────────────────────────────────────────────────
pub use crate::status::{MotorFlags, MotorStatus, MoveFlags};
pub use crate::units::{MotorSubclass, Raw, Scaling};

// ─── Session ────────────────────────────────────────────────────────
pub use crate::clock::{Clock, ManualClock, SystemClock, Tick};
pub use crate::context::MotionContext;
pub use crate::interrupt::{InterruptPoller, UserInterrupt};
