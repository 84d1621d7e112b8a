//! Runtime context handed to every handler invocation.

use super::watchdog::Watchdog;
use crate::core::State;
use std::time::{Duration, Instant};

/// Ephemeral view of the current attempt, passed by reference to handlers.
///
/// Carries the state under execution, the 1-based attempt number, and a
/// handle for signalling progress to the watchdog. The engine records no
/// activity on the handler's behalf; "progress" is a domain concept only
/// the handler can define.
///
/// Handlers that need their own mutable state capture it in their closure
/// (e.g. an `Arc<Mutex<_>>`); the engine contracts only on the
/// [`StateResult`](crate::core::StateResult) and timing it observes.
#[derive(Clone, Debug)]
pub struct ExecutionContext<S: State> {
    state: S,
    attempt: u32,
    started_at: Instant,
    watchdog: Watchdog,
}

impl<S: State> ExecutionContext<S> {
    pub(crate) fn new(state: S, attempt: u32, watchdog: Watchdog) -> Self {
        Self {
            state,
            attempt,
            started_at: Instant::now(),
            watchdog,
        }
    }

    /// The state being executed.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// 1-based attempt number; resets each time the state is freshly
    /// entered (it does not reset across retries of the same state).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Time elapsed since this attempt started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Signal progress to the armed watchdog. Safe to call from the
    /// handler's own thread while the engine waits on a deadline.
    pub fn record_activity(&self) {
        self.watchdog.record_activity();
    }
}
