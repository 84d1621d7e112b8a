//! Per-state configuration: retry limit, timeout, failover target.

use super::state::State;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata and configuration for a single state.
///
/// Every declared state carries one of these; construction of the machine
/// fails if any state is missing an entry. Fields are set with chainable
/// methods and are immutable once the machine is built.
///
/// # Example
///
/// ```rust
/// use waypoint::core::StateMetadata;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Step { Fetch, Save, Error }
///
/// impl waypoint::core::State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::Fetch => "Fetch",
///             Self::Save => "Save",
///             Self::Error => "Error",
///         }
///     }
/// }
///
/// let meta = StateMetadata::new("Fetch")
///     .description("Fetch data from the upstream API")
///     .max_retries(2)
///     .timeout(Duration::from_secs(30))
///     .failover(Step::Error);
///
/// assert_eq!(meta.max_retries, 2);
/// assert_eq!(meta.failover_state, Some(Step::Error));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateMetadata<S: State> {
    /// Display name for the state.
    pub name: String,
    /// Brief description of what the state does.
    pub description: String,
    /// Maximum retry attempts before failover or exhaustion (default: 3).
    /// A state with `max_retries = k` is attempted at most `k + 1` times.
    pub max_retries: u32,
    /// Hard deadline for a single handler invocation. `None` means the
    /// handler may run unbounded. Must be non-zero; validated at build.
    pub timeout: Option<Duration>,
    /// State to jump to once retries are exhausted. Must be a declared
    /// state other than the one this metadata is attached to.
    pub failover_state: Option<S>,
}

impl<S: State> StateMetadata<S> {
    /// Create metadata with the given display name and defaults:
    /// no description, `max_retries = 3`, no timeout, no failover.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            max_retries: 3,
            timeout: None,
            failover_state: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the retry limit.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-attempt hard deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the failover target entered once retries are exhausted.
    pub fn failover(mut self, state: S) -> Self {
        self.failover_state = Some(state);
        self
    }
}
