//! Error types for machine construction and execution.

use crate::core::{StateResult, TransitionError};
use std::time::Duration;
use thiserror::Error;

/// Configuration problems detected while building a machine.
///
/// These indicate wiring bugs, not runtime failures; they are raised
/// eagerly by [`StateMachineBuilder::build`](super::StateMachineBuilder::build)
/// so that a misconfigured machine can never start running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("no states declared. Register at least one with .state(state, metadata)")]
    NoStates,

    #[error("initial state '{state}' has no registered metadata")]
    UnknownInitialState { state: String },

    #[error("transition source '{state}' has no registered metadata")]
    UnknownTransitionSource { state: String },

    #[error("transition target '{state}' has no registered metadata")]
    UnknownTransitionTarget { state: String },

    #[error("failover target '{failover}' of state '{state}' has no registered metadata")]
    UnknownFailover { state: String, failover: String },

    #[error("state '{state}' fails over to itself, which would loop forever")]
    SelfFailover { state: String },

    #[error("state '{state}' has no registered handler")]
    MissingHandler { state: String },

    #[error("handler registered for undeclared state '{state}'")]
    UnknownHandlerState { state: String },

    #[error("state '{state}' has a zero timeout; use no timeout for unbounded execution")]
    ZeroTimeout { state: String },
}

/// Failures surfaced by [`StateMachine::run`](super::StateMachine::run).
///
/// `WatchdogExpired` and `StatesExhausted` are runtime-reported failures of
/// the workflow itself. `MissingHandler` and `MissingMetadata` indicate a
/// programming defect and are never retried.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("watchdog expired: no activity for {idle:?} (threshold {threshold:?})")]
    WatchdogExpired { idle: Duration, threshold: Duration },

    #[error("state '{state}' exhausted after {attempts} attempts (last result: {last_result}) with no failover")]
    StatesExhausted {
        state: String,
        attempts: u32,
        last_result: StateResult,
    },

    #[error("no handler registered for state '{state}'")]
    MissingHandler { state: String },

    #[error("no metadata registered for state '{state}'")]
    MissingMetadata { state: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("step limit of {limit} attempts reached; possible transition cycle")]
    StepLimit { limit: usize },
}
