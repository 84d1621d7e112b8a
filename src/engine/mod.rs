//! The imperative shell: builder, run loop, watchdog and handler contexts.
//!
//! A [`StateMachine`] is constructed once with its full static
//! configuration via [`StateMachineBuilder`], then driven to completion
//! with [`StateMachine::run`]. The control loop is single-threaded; only
//! deadline-bounded handler invocations use a background thread.

mod builder;
mod context;
mod error;
mod machine;
mod watchdog;

pub use builder::StateMachineBuilder;
pub use context::ExecutionContext;
pub use error::{ConfigError, RunError};
pub use machine::{Handler, RunOutcome, RunReport, StateMachine};
pub use watchdog::{Watchdog, WatchdogPolicy};
