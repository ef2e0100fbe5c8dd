//! Motor error types.
//!
//! Every motion-core operation returns [`MotorResult`]. Errors propagate
//! unchanged through fallback chains and wait loops; the only place they
//! are swallowed is the best-effort multi-motor abort.

use thiserror::Error;

/// Error returned by motor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotorError {
    /// A required argument or collection was missing or empty.
    #[error("Null argument: {0}")]
    NullArgument(String),

    /// An internal invariant of a motor record is violated.
    #[error("Corrupt data structure: {0}")]
    CorruptDataStructure(String),

    /// The call does not apply to this motor subclass.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// No capability in the fallback chain is present.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Unknown enum value or out-of-domain argument.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// The requested position lies outside the software limits.
    #[error("Would exceed limit: {0}")]
    WouldExceedLimit(String),

    /// Speed changes are forbidden by the configured limits.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A move was stopped by a limit, an error bit or a user abort.
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// The user asked to pause. Resumable.
    #[error("Pause requested: {0}")]
    PauseRequested(String),

    /// A bounded retry loop ran out of attempts.
    #[error("Timed out: {0}")]
    TimedOut(String),

    /// A collaborator reported a generic failure.
    #[error("Function failed: {0}")]
    FunctionFailed(String),

    /// The device accepted a command but did not carry it out.
    #[error("Device action failed: {0}")]
    DeviceActionFailed(String),

    /// Transport or hardware communication error reported by a driver.
    #[error("Device I/O error: {0}")]
    DeviceIo(String),
}

/// Discriminant of [`MotorError`] for matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullArgument,
    CorruptDataStructure,
    TypeMismatch,
    Unsupported,
    IllegalArgument,
    WouldExceedLimit,
    PermissionDenied,
    Interrupted,
    PauseRequested,
    TimedOut,
    FunctionFailed,
    DeviceActionFailed,
    DeviceIo,
}

impl MotorError {
    /// Returns the kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NullArgument(_) => ErrorKind::NullArgument,
            Self::CorruptDataStructure(_) => ErrorKind::CorruptDataStructure,
            Self::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::IllegalArgument(_) => ErrorKind::IllegalArgument,
            Self::WouldExceedLimit(_) => ErrorKind::WouldExceedLimit,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Interrupted(_) => ErrorKind::Interrupted,
            Self::PauseRequested(_) => ErrorKind::PauseRequested,
            Self::TimedOut(_) => ErrorKind::TimedOut,
            Self::FunctionFailed(_) => ErrorKind::FunctionFailed,
            Self::DeviceActionFailed(_) => ErrorKind::DeviceActionFailed,
            Self::DeviceIo(_) => ErrorKind::DeviceIo,
        }
    }

    /// Returns the message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::NullArgument(m)
            | Self::CorruptDataStructure(m)
            | Self::TypeMismatch(m)
            | Self::Unsupported(m)
            | Self::IllegalArgument(m)
            | Self::WouldExceedLimit(m)
            | Self::PermissionDenied(m)
            | Self::Interrupted(m)
            | Self::PauseRequested(m)
            | Self::TimedOut(m)
            | Self::FunctionFailed(m)
            | Self::DeviceActionFailed(m)
            | Self::DeviceIo(m) => m,
        }
    }

    /// Shorthand for an `Unsupported` error naming the motor and operation.
    pub fn unsupported(motor: &str, operation: &str) -> Self {
        Self::Unsupported(format!(
            "Operation '{operation}' is not supported for motor '{motor}'"
        ))
    }
}

/// Result alias used throughout the motion crates.
pub type MotorResult<T> = Result<T, MotorError>;
