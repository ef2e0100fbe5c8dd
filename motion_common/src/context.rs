//! Process-wide motion context.
//!
//! A [`MotionContext`] is created once at the root of a session and shared
//! by every motor. It owns the clock, the user-interrupt poller and the
//! poll-loop settings, so none of them live in hidden statics.

use crate::clock::{Clock, SystemClock, Tick};
use crate::config::MotionSettings;
use crate::interrupt::{InterruptPoller, NoInterrupts, UserInterrupt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

pub struct MotionContext {
    settings: MotionSettings,
    clock: Arc<dyn Clock>,
    interrupts: Mutex<Box<dyn InterruptPoller>>,
}

impl std::fmt::Debug for MotionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl MotionContext {
    pub fn new(
        settings: MotionSettings,
        clock: Arc<dyn Clock>,
        interrupts: Box<dyn InterruptPoller>,
    ) -> Self {
        Self {
            settings,
            clock,
            interrupts: Mutex::new(interrupts),
        }
    }

    /// Wall clock, no interrupts, default settings.
    pub fn system() -> Self {
        Self::new(
            MotionSettings::default(),
            Arc::new(SystemClock::new()),
            Box::new(NoInterrupts),
        )
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    /// One wait-loop sleep.
    pub fn sleep_poll_interval(&self) {
        self.clock.sleep(self.settings.poll_duration());
    }

    /// Polls the user-interrupt source once.
    pub fn poll_interrupt(&self) -> UserInterrupt {
        match self.interrupts.lock() {
            Ok(mut poller) => poller.poll(),
            Err(_) => {
                warn!("User interrupt poller is poisoned");
                UserInterrupt::Error
            }
        }
    }

    /// Replaces the interrupt source, returning the previous one.
    pub fn replace_interrupts(
        &self,
        interrupts: Box<dyn InterruptPoller>,
    ) -> Option<Box<dyn InterruptPoller>> {
        self.interrupts
            .lock()
            .ok()
            .map(|mut guard| std::mem::replace(&mut *guard, interrupts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::interrupt::ScriptedInterrupts;

    #[test]
    fn test_sleep_poll_interval_uses_clock() {
        let clock = Arc::new(ManualClock::new());
        let ctx = MotionContext::new(MotionSettings::default(), clock.clone(), Box::new(NoInterrupts));
        ctx.sleep_poll_interval();
        ctx.sleep_poll_interval();
        assert_eq!(ctx.now().saturating_since(Tick::ZERO), Duration::from_millis(20));
    }

    #[test]
    fn test_replace_interrupts() {
        let ctx = MotionContext::new(
            MotionSettings::default(),
            Arc::new(ManualClock::new()),
            Box::new(NoInterrupts),
        );
        assert_eq!(ctx.poll_interrupt(), UserInterrupt::None);
        ctx.replace_interrupts(Box::new(ScriptedInterrupts::after(0, UserInterrupt::Abort)));
        assert_eq!(ctx.poll_interrupt(), UserInterrupt::Abort);
        assert_eq!(ctx.poll_interrupt(), UserInterrupt::None);
    }
}
