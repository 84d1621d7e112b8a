//! Waypoint: a retrying, failover-aware finite-state execution engine.
//!
//! Given a set of states, per-state metadata (retry limits, timeouts,
//! failover targets) and a set of guarded transitions, the engine drives
//! execution from an initial state to a terminal state, invoking one
//! registered handler per state and composing several recovery policies:
//!
//! - **Retries**: a state with `max_retries = k` is attempted up to
//!   `k + 1` times; `Failure`, `Retry` and `Timeout` all count.
//! - **Timeouts**: a handler with a configured deadline runs on a
//!   background thread; the engine stops waiting at the deadline and
//!   treats the attempt as a timeout (the handler is not preempted).
//! - **Failover**: once retries are exhausted, execution jumps to the
//!   state's configured failover target, if any.
//! - **Watchdog**: an armable liveness monitor ends the run when no
//!   progress is signalled within its threshold.
//! - **History**: every attempt appends one immutable entry to a bounded
//!   FIFO log.
//!
//! # Example
//!
//! ```rust
//! use waypoint::core::{StateMetadata, StateResult, Transition};
//! use waypoint::engine::{RunOutcome, StateMachineBuilder};
//! use waypoint::state_enum;
//!
//! state_enum! {
//!     enum OrderState {
//!         Validate,
//!         Charge,
//!         Ship,
//!     }
//! }
//!
//! let mut machine = StateMachineBuilder::new()
//!     .state(OrderState::Validate, StateMetadata::new("Validate"))
//!     .state(OrderState::Charge, StateMetadata::new("Charge").max_retries(1))
//!     .state(OrderState::Ship, StateMetadata::new("Ship"))
//!     .transition(Transition::new(OrderState::Validate, OrderState::Charge))
//!     .transition(Transition::new(OrderState::Charge, OrderState::Ship))
//!     .initial(OrderState::Validate)
//!     .handler(OrderState::Validate, |_ctx| StateResult::Success)
//!     .handler(OrderState::Charge, |_ctx| StateResult::Success)
//!     .handler(OrderState::Ship, |_ctx| StateResult::Success)
//!     .build()
//!     .unwrap();
//!
//! let report = machine.run().unwrap();
//! assert_eq!(report.outcome, RunOutcome::Completed);
//! assert_eq!(report.final_state, OrderState::Ship);
//! assert_eq!(machine.history().len(), 3);
//! ```

pub mod core;
pub mod engine;
mod macros;

// Re-export commonly used types
pub use core::{
    Guard, GuardError, History, HistoryEntry, State, StateMetadata, StateResult, Transition,
    TransitionError, TransitionTable,
};
pub use engine::{
    ConfigError, ExecutionContext, Handler, RunError, RunOutcome, RunReport, StateMachine,
    StateMachineBuilder, Watchdog, WatchdogPolicy,
};
