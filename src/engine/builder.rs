//! Builder for constructing execution machines.
//!
//! The full static configuration — declared states with their metadata,
//! transitions, the initial state and one handler per state — is supplied
//! here and validated as a unit before a machine can run. Validation is
//! fail-fast: a machine with a dangling transition endpoint, a missing
//! handler or a self-failover never gets built.

use super::context::ExecutionContext;
use super::error::ConfigError;
use super::machine::{Handler, StateMachine};
use super::watchdog::WatchdogPolicy;
use crate::core::{State, StateMetadata, StateResult, Transition, TransitionTable};
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_MAX_STEPS: usize = 1000;

/// Builder for [`StateMachine`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{StateMetadata, StateResult, Transition};
/// use waypoint::engine::StateMachineBuilder;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Step { Fetch, Save }
///
/// impl waypoint::core::State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::Fetch => "Fetch",
///             Self::Save => "Save",
///         }
///     }
/// }
///
/// let machine = StateMachineBuilder::new()
///     .state(Step::Fetch, StateMetadata::new("Fetch"))
///     .state(Step::Save, StateMetadata::new("Save"))
///     .transition(Transition::new(Step::Fetch, Step::Save))
///     .initial(Step::Fetch)
///     .handler(Step::Fetch, |_ctx| StateResult::Success)
///     .handler(Step::Save, |_ctx| StateResult::Success)
///     .build()
///     .unwrap();
///
/// assert_eq!(machine.current_state(), &Step::Fetch);
/// ```
pub struct StateMachineBuilder<S: State> {
    metadata: HashMap<S, StateMetadata<S>>,
    transitions: Vec<Transition<S>>,
    handlers: HashMap<S, Handler<S>>,
    initial: Option<S>,
    history_capacity: Option<usize>,
    max_steps: usize,
    watchdog_policy: WatchdogPolicy,
    clear_history_on_reset: bool,
}

impl<S: State> StateMachineBuilder<S> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            metadata: HashMap::new(),
            transitions: Vec::new(),
            handlers: HashMap::new(),
            initial: None,
            history_capacity: None,
            max_steps: DEFAULT_MAX_STEPS,
            watchdog_policy: WatchdogPolicy::default(),
            clear_history_on_reset: false,
        }
    }

    /// Declare a state with its metadata. The declared state set is
    /// exactly the set of states registered through this method.
    pub fn state(mut self, state: S, metadata: StateMetadata<S>) -> Self {
        self.metadata.insert(state, metadata);
        self
    }

    /// Declare a transition. Declaration order matters: the first matching
    /// transition out of a state wins.
    pub fn transition(mut self, transition: Transition<S>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Declare multiple transitions at once, preserving order.
    pub fn transitions(mut self, transitions: impl IntoIterator<Item = Transition<S>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Register the handler invoked for each attempt at `state`.
    pub fn handler<F>(mut self, state: S, handler: F) -> Self
    where
        F: Fn(&ExecutionContext<S>) -> StateResult + Send + Sync + 'static,
    {
        self.handlers.insert(state, Arc::new(handler));
        self
    }

    /// Bound the history log; oldest entries are evicted FIFO once full.
    /// Unbounded by default.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Cap the number of attempts a single `run()` may execute
    /// (default: 1000). A safety valve against transition cycles.
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Choose what `run()` does when the watchdog expires
    /// (default: [`WatchdogPolicy::Propagate`]).
    pub fn watchdog_policy(mut self, policy: WatchdogPolicy) -> Self {
        self.watchdog_policy = policy;
        self
    }

    /// Clear the history log on `reset()` instead of retaining it across
    /// runs (default: retain).
    pub fn clear_history_on_reset(mut self, clear: bool) -> Self {
        self.clear_history_on_reset = clear;
        self
    }

    /// Validate the configuration and build the machine.
    pub fn build(self) -> Result<StateMachine<S>, ConfigError> {
        if self.metadata.is_empty() {
            return Err(ConfigError::NoStates);
        }

        let initial = self.initial.ok_or(ConfigError::MissingInitialState)?;
        if !self.metadata.contains_key(&initial) {
            return Err(ConfigError::UnknownInitialState {
                state: initial.name().to_string(),
            });
        }

        for transition in &self.transitions {
            if !self.metadata.contains_key(&transition.from) {
                return Err(ConfigError::UnknownTransitionSource {
                    state: transition.from.name().to_string(),
                });
            }
            if !self.metadata.contains_key(&transition.to) {
                return Err(ConfigError::UnknownTransitionTarget {
                    state: transition.to.name().to_string(),
                });
            }
        }

        for (state, metadata) in &self.metadata {
            if let Some(timeout) = metadata.timeout {
                if timeout.is_zero() {
                    return Err(ConfigError::ZeroTimeout {
                        state: state.name().to_string(),
                    });
                }
            }
            if let Some(failover) = &metadata.failover_state {
                if failover == state {
                    return Err(ConfigError::SelfFailover {
                        state: state.name().to_string(),
                    });
                }
                if !self.metadata.contains_key(failover) {
                    return Err(ConfigError::UnknownFailover {
                        state: state.name().to_string(),
                        failover: failover.name().to_string(),
                    });
                }
            }
            if !self.handlers.contains_key(state) {
                return Err(ConfigError::MissingHandler {
                    state: state.name().to_string(),
                });
            }
        }

        for state in self.handlers.keys() {
            if !self.metadata.contains_key(state) {
                return Err(ConfigError::UnknownHandlerState {
                    state: state.name().to_string(),
                });
            }
        }

        tracing::info!(
            states = self.metadata.len(),
            transitions = self.transitions.len(),
            initial = initial.name(),
            "state machine built"
        );

        Ok(StateMachine::from_parts(
            self.metadata,
            TransitionTable::new(self.transitions),
            self.handlers,
            initial,
            self.history_capacity,
            self.max_steps,
            self.watchdog_policy,
            self.clear_history_on_reset,
        ))
    }
}

impl<S: State> Default for StateMachineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        A,
        B,
        Error,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::A => "A",
                Self::B => "B",
                Self::Error => "Error",
            }
        }
    }

    fn succeed(_: &ExecutionContext<TestState>) -> StateResult {
        StateResult::Success
    }

    fn two_state_builder() -> StateMachineBuilder<TestState> {
        StateMachineBuilder::new()
            .state(TestState::A, StateMetadata::new("A"))
            .state(TestState::B, StateMetadata::new("B"))
            .handler(TestState::A, succeed)
            .handler(TestState::B, succeed)
    }

    #[test]
    fn builder_requires_states() {
        let result = StateMachineBuilder::<TestState>::new().build();
        assert!(matches!(result, Err(ConfigError::NoStates)));
    }

    #[test]
    fn builder_requires_initial_state() {
        let result = two_state_builder().build();
        assert!(matches!(result, Err(ConfigError::MissingInitialState)));
    }

    #[test]
    fn initial_state_must_be_declared() {
        let result = two_state_builder().initial(TestState::Error).build();
        assert!(matches!(
            result,
            Err(ConfigError::UnknownInitialState { .. })
        ));
    }

    #[test]
    fn transition_endpoints_must_be_declared() {
        let result = two_state_builder()
            .transition(Transition::new(TestState::A, TestState::Error))
            .initial(TestState::A)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::UnknownTransitionTarget { .. })
        ));

        let result = two_state_builder()
            .transition(Transition::new(TestState::Error, TestState::B))
            .initial(TestState::A)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::UnknownTransitionSource { .. })
        ));
    }

    #[test]
    fn every_declared_state_needs_a_handler() {
        let result = StateMachineBuilder::new()
            .state(TestState::A, StateMetadata::new("A"))
            .state(TestState::B, StateMetadata::new("B"))
            .handler(TestState::A, succeed)
            .initial(TestState::A)
            .build();

        assert!(matches!(result, Err(ConfigError::MissingHandler { .. })));
    }

    #[test]
    fn handlers_for_undeclared_states_are_rejected() {
        let result = two_state_builder()
            .handler(TestState::Error, succeed)
            .initial(TestState::A)
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::UnknownHandlerState { .. })
        ));
    }

    #[test]
    fn self_failover_is_rejected() {
        let result = StateMachineBuilder::new()
            .state(
                TestState::A,
                StateMetadata::new("A").failover(TestState::A),
            )
            .handler(TestState::A, succeed)
            .initial(TestState::A)
            .build();

        assert!(matches!(result, Err(ConfigError::SelfFailover { .. })));
    }

    #[test]
    fn failover_target_must_be_declared() {
        let result = StateMachineBuilder::new()
            .state(
                TestState::A,
                StateMetadata::new("A").failover(TestState::Error),
            )
            .handler(TestState::A, succeed)
            .initial(TestState::A)
            .build();

        assert!(matches!(result, Err(ConfigError::UnknownFailover { .. })));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = StateMachineBuilder::new()
            .state(
                TestState::A,
                StateMetadata::new("A").timeout(Duration::ZERO),
            )
            .handler(TestState::A, succeed)
            .initial(TestState::A)
            .build();

        assert!(matches!(result, Err(ConfigError::ZeroTimeout { .. })));
    }

    #[test]
    fn valid_configuration_builds() {
        let machine = two_state_builder()
            .transition(Transition::new(TestState::A, TestState::B))
            .initial(TestState::A)
            .build()
            .unwrap();

        assert_eq!(machine.current_state(), &TestState::A);
    }
}
