//! Transitions between states and the guards that gate them.
//!
//! Transitions are declared up front and evaluated in declaration order:
//! the first transition out of the current state whose guard passes (or
//! that has no guard) wins. A state with no matching outgoing transition
//! is terminal.

use super::state::State;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error produced by a fallible guard predicate.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct GuardError(pub String);

impl GuardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors raised while selecting the next state.
///
/// A failing guard propagates; it is never treated as `false`, because
/// masking a broken predicate would silently terminate runs.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("guard failed on transition '{from}' -> '{to}': {source}")]
    Guard {
        from: String,
        to: String,
        source: GuardError,
    },
}

/// Predicate that decides whether a transition may be taken.
///
/// Guards take no arguments: they close over whatever shared flags or
/// handles they need. Use [`Guard::new`] for plain boolean predicates and
/// [`Guard::fallible`] for predicates whose evaluation can itself fail.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Guard;
/// use std::sync::{
///     atomic::{AtomicBool, Ordering},
///     Arc,
/// };
///
/// let ready = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&ready);
/// let guard = Guard::new(move || flag.load(Ordering::SeqCst));
///
/// assert_eq!(guard.check().unwrap(), false);
/// ready.store(true, Ordering::SeqCst);
/// assert_eq!(guard.check().unwrap(), true);
/// ```
pub struct Guard {
    predicate: Arc<dyn Fn() -> Result<bool, GuardError> + Send + Sync>,
}

impl Guard {
    /// Create a guard from an infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(move || Ok(predicate())),
        }
    }

    /// Create a guard whose evaluation can fail.
    ///
    /// The error propagates out of `run()` as a [`TransitionError`].
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn() -> Result<bool, GuardError> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the guard.
    pub fn check(&self) -> Result<bool, GuardError> {
        (self.predicate)()
    }
}

impl Clone for Guard {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard(..)")
    }
}

/// A directed edge between two states, optionally gated by a guard.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Transition;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Step { Fetch, Process }
///
/// impl waypoint::core::State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::Fetch => "Fetch",
///             Self::Process => "Process",
///         }
///     }
/// }
///
/// let unconditional = Transition::new(Step::Fetch, Step::Process);
/// let gated = Transition::new(Step::Fetch, Step::Process).when(|| true);
/// # let _ = (unconditional, gated);
/// ```
#[derive(Clone, Debug)]
pub struct Transition<S: State> {
    /// The state this transition originates from.
    pub from: S,
    /// The state this transition leads to.
    pub to: S,
    /// Optional guard; absent means the transition is always allowed.
    pub guard: Option<Guard>,
}

impl<S: State> Transition<S> {
    /// Create an unconditional transition.
    pub fn new(from: S, to: S) -> Self {
        Self {
            from,
            to,
            guard: None,
        }
    }

    /// Gate the transition on an infallible predicate.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Gate the transition on a predicate that can fail.
    pub fn when_fallible<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> Result<bool, GuardError> + Send + Sync + 'static,
    {
        self.guard = Some(Guard::fallible(predicate));
        self
    }

    /// Gate the transition on a pre-built [`Guard`].
    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// Ordered lookup table over declared transitions.
///
/// Built once at machine construction; transitions are grouped by source
/// state with their declaration order preserved inside each group.
#[derive(Clone, Debug)]
pub struct TransitionTable<S: State> {
    by_source: HashMap<S, Vec<Transition<S>>>,
}

impl<S: State> TransitionTable<S> {
    /// Group a declared transition list by source state.
    pub fn new(transitions: Vec<Transition<S>>) -> Self {
        let mut by_source: HashMap<S, Vec<Transition<S>>> = HashMap::new();
        for transition in transitions {
            by_source
                .entry(transition.from.clone())
                .or_default()
                .push(transition);
        }
        Self { by_source }
    }

    /// Select the next state out of `from`.
    ///
    /// Evaluates the outgoing transitions in declaration order and returns
    /// the target of the first whose guard passes (or that has no guard).
    /// `Ok(None)` is the terminal signal: no outgoing transition matched.
    pub fn next_state(&self, from: &S) -> Result<Option<&S>, TransitionError> {
        for transition in self.by_source.get(from).into_iter().flatten() {
            let allowed = match &transition.guard {
                Some(guard) => guard.check().map_err(|source| TransitionError::Guard {
                    from: transition.from.name().to_string(),
                    to: transition.to.name().to_string(),
                    source,
                })?,
                None => true,
            };
            if allowed {
                return Ok(Some(&transition.to));
            }
        }
        Ok(None)
    }

    /// Number of declared transitions.
    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    /// True if no transitions were declared.
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Iterate over all declared transitions, grouped by source state.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<S>> {
        self.by_source.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Start,
        Middle,
        End,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Start => "Start",
                Self::Middle => "Middle",
                Self::End => "End",
            }
        }
    }

    #[test]
    fn unconditional_transition_is_taken() {
        let table = TransitionTable::new(vec![Transition::new(TestState::Start, TestState::End)]);

        let next = table.next_state(&TestState::Start).unwrap();
        assert_eq!(next, Some(&TestState::End));
    }

    #[test]
    fn no_outgoing_transition_is_terminal() {
        let table = TransitionTable::new(vec![Transition::new(TestState::Start, TestState::End)]);

        let next = table.next_state(&TestState::End).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn false_guard_skips_transition() {
        let table = TransitionTable::new(vec![
            Transition::new(TestState::Start, TestState::Middle).when(|| false),
            Transition::new(TestState::Start, TestState::End),
        ]);

        let next = table.next_state(&TestState::Start).unwrap();
        assert_eq!(next, Some(&TestState::End));
    }

    #[test]
    fn first_true_guard_wins_in_declaration_order() {
        let table = TransitionTable::new(vec![
            Transition::new(TestState::Start, TestState::Middle).when(|| true),
            Transition::new(TestState::Start, TestState::End).when(|| true),
        ]);

        let next = table.next_state(&TestState::Start).unwrap();
        assert_eq!(next, Some(&TestState::Middle));
    }

    #[test]
    fn all_false_guards_are_terminal() {
        let table = TransitionTable::new(vec![
            Transition::new(TestState::Start, TestState::Middle).when(|| false),
            Transition::new(TestState::Start, TestState::End).when(|| false),
        ]);

        let next = table.next_state(&TestState::Start).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn guard_error_propagates() {
        let table = TransitionTable::new(vec![Transition::new(TestState::Start, TestState::End)
            .when_fallible(|| Err(GuardError::new("flag store unavailable")))]);

        let err = table.next_state(&TestState::Start).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Start"));
        assert!(message.contains("End"));
        assert!(message.contains("flag store unavailable"));
    }

    #[test]
    fn guard_error_is_not_treated_as_false() {
        // A later unconditional transition must not be reached when an
        // earlier guard errors.
        let table = TransitionTable::new(vec![
            Transition::new(TestState::Start, TestState::Middle)
                .when_fallible(|| Err(GuardError::new("boom"))),
            Transition::new(TestState::Start, TestState::End),
        ]);

        assert!(table.next_state(&TestState::Start).is_err());
    }

    #[test]
    fn guard_closes_over_shared_flags() {
        let ready = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ready);

        let table = TransitionTable::new(vec![Transition::new(TestState::Start, TestState::End)
            .when(move || flag.load(Ordering::SeqCst))]);

        assert_eq!(table.next_state(&TestState::Start).unwrap(), None);
        ready.store(true, Ordering::SeqCst);
        assert_eq!(
            table.next_state(&TestState::Start).unwrap(),
            Some(&TestState::End)
        );
    }

    #[test]
    fn len_counts_all_transitions() {
        let table = TransitionTable::new(vec![
            Transition::new(TestState::Start, TestState::Middle),
            Transition::new(TestState::Start, TestState::End),
            Transition::new(TestState::Middle, TestState::End),
        ]);

        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
    }
}
