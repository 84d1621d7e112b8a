//! Core data types for the execution engine.
//!
//! This module contains the static configuration and record types:
//! - State identifiers via the `State` trait
//! - Per-state metadata (retry limits, timeouts, failover targets)
//! - Guarded transitions and the ordered transition table
//! - Handler results and the bounded execution history
//!
//! Everything here is plain data; the imperative run loop lives in
//! [`crate::engine`].

mod history;
mod metadata;
mod result;
mod state;
mod transition;

pub use history::{History, HistoryEntry};
pub use metadata::StateMetadata;
pub use result::StateResult;
pub use state::State;
pub use transition::{Guard, GuardError, Transition, TransitionError, TransitionTable};
