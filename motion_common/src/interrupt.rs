//! User-interrupt polling.
//!
//! Wait loops call [`InterruptPoller::poll`] once per iteration. The
//! returned [`UserInterrupt`] decides whether the wait continues, aborts
//! the move or fails with a pause request.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Result of one interrupt poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserInterrupt {
    #[default]
    None,
    /// Stop the motion and fail the operation.
    Abort,
    /// Fail with a resumable pause request.
    Pause,
    /// The poller itself failed.
    Error,
}

impl UserInterrupt {
    const fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Abort => 1,
            Self::Pause => 2,
            Self::Error => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Abort,
            2 => Self::Pause,
            3 => Self::Error,
            _ => Self::None,
        }
    }
}

/// Source of user interrupts.
pub trait InterruptPoller: Send {
    fn poll(&mut self) -> UserInterrupt;
}

/// Poller that never interrupts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupts;

impl InterruptPoller for NoInterrupts {
    fn poll(&mut self) -> UserInterrupt {
        UserInterrupt::None
    }
}

/// Poller that replays a fixed script, then reports `None` forever.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInterrupts {
    script: VecDeque<UserInterrupt>,
}

impl ScriptedInterrupts {
    pub fn new(script: impl IntoIterator<Item = UserInterrupt>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// `idle_polls` quiet polls followed by `interrupt`.
    pub fn after(idle_polls: usize, interrupt: UserInterrupt) -> Self {
        Self::new(
            std::iter::repeat_n(UserInterrupt::None, idle_polls)
                .chain(std::iter::once(interrupt)),
        )
    }
}

impl InterruptPoller for ScriptedInterrupts {
    fn poll(&mut self) -> UserInterrupt {
        self.script.pop_front().unwrap_or_default()
    }
}

/// Shared one-shot request raised from elsewhere in the process,
/// e.g. a signal handler. Each raised request is consumed by one poll.
#[derive(Debug, Clone, Default)]
pub struct InterruptRequest {
    pending: Arc<AtomicU8>,
}

impl InterruptRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, interrupt: UserInterrupt) {
        self.pending.store(interrupt.to_u8(), Ordering::SeqCst);
    }
}

impl InterruptPoller for InterruptRequest {
    fn poll(&mut self) -> UserInterrupt {
        UserInterrupt::from_u8(self.pending.swap(0, Ordering::SeqCst))
    }
}
