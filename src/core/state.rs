//! Core State trait for engine states.
//!
//! Domain states are opaque, comparable identifiers drawn from a finite set
//! fixed at construction. The engine keys its metadata registry, handler
//! registry and retry counters by state, hence the hashing bounds.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for domain states driven by the execution engine.
///
/// # Required Traits
///
/// - `Clone` + `Eq` + `Hash`: states are table keys (metadata, handlers,
///   retry counters) and are copied into history entries
/// - `Debug`: states must be debuggable for diagnostics
/// - `Serialize` + `DeserializeOwned`: states appear in serializable
///   history entries
/// - `Send` + `Sync` + `'static`: contexts carrying a state may cross onto
///   the worker thread used for deadline-bounded handler invocation
///
/// Whether a state is terminal is not a property of the state itself: a run
/// ends at any state that has no matching outgoing transition after a
/// success or skip result.
///
/// # Example
///
/// ```rust
/// use waypoint::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum OrderState {
///     Validate,
///     Charge,
///     Ship,
/// }
///
/// impl State for OrderState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Validate => "Validate",
///             Self::Charge => "Charge",
///             Self::Ship => "Ship",
///         }
///     }
/// }
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;
}
