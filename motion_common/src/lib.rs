//! Motion Common Library
//!
//! Shared building blocks for the motion workspace crates.
//!
//! # Module Structure
//!
//! - [`error`] - Motor error type and result alias
//! - [`status`] - Status bits, move flags and motor flags
//! - [`units`] - Raw ↔ engineering conversion and the [`units::Raw`] variant
//! - [`motor`] - Per-motor configuration types
//! - [`config`] - Configuration loading traits and session settings
//! - [`clock`] - Injectable monotonic clock
//! - [`interrupt`] - User-interrupt polling
//! - [`field`] - Field store with change notification
//! - [`context`] - Process-wide motion context
//! - [`logging`] - Tracing subscriber setup
//! - [`prelude`] - Common re-exports for convenience

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod interrupt;
pub mod logging;
pub mod motor;
pub mod prelude;
pub mod status;
pub mod units;
