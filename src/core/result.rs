//! Outcome of a single handler invocation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of executing a state's handler.
///
/// Determines the next action the engine takes: advance along the
/// transition table, re-attempt the same state, or begin failure recovery.
///
/// # Example
///
/// ```rust
/// use waypoint::core::StateResult;
///
/// assert!(StateResult::Success.is_success_like());
/// assert!(StateResult::Skip.is_success_like());
/// assert!(StateResult::Timeout.is_failure_like());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateResult {
    /// State completed; proceed along the transition table.
    Success,
    /// State failed; retry, then fail over or exhaust.
    Failure,
    /// State asked to be re-attempted immediately.
    ///
    /// A `Retry` counts against `max_retries` exactly like `Failure`, so a
    /// state with `max_retries = 0` terminates after a single attempt no
    /// matter which failure-like result its handler returns.
    Retry,
    /// State was skipped; treated like `Success` for transition selection
    /// and retry-counter reset.
    Skip,
    /// The handler did not finish within the state's configured timeout.
    /// Treated like `Failure` for retry counting and failover routing.
    Timeout,
}

impl StateResult {
    /// True for results that advance the machine (`Success` or `Skip`).
    pub fn is_success_like(self) -> bool {
        matches!(self, Self::Success | Self::Skip)
    }

    /// True for results that count against the retry limit
    /// (`Failure`, `Retry` or `Timeout`).
    pub fn is_failure_like(self) -> bool {
        matches!(self, Self::Failure | Self::Retry | Self::Timeout)
    }
}

impl fmt::Display for StateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Retry => "retry",
            Self::Skip => "skip",
            Self::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_skip_are_success_like() {
        assert!(StateResult::Success.is_success_like());
        assert!(StateResult::Skip.is_success_like());
        assert!(!StateResult::Failure.is_success_like());
        assert!(!StateResult::Retry.is_success_like());
        assert!(!StateResult::Timeout.is_success_like());
    }

    #[test]
    fn failure_retry_and_timeout_are_failure_like() {
        assert!(StateResult::Failure.is_failure_like());
        assert!(StateResult::Retry.is_failure_like());
        assert!(StateResult::Timeout.is_failure_like());
        assert!(!StateResult::Success.is_failure_like());
        assert!(!StateResult::Skip.is_failure_like());
    }

    #[test]
    fn every_result_is_exactly_one_kind() {
        for result in [
            StateResult::Success,
            StateResult::Failure,
            StateResult::Retry,
            StateResult::Skip,
            StateResult::Timeout,
        ] {
            assert_ne!(result.is_success_like(), result.is_failure_like());
        }
    }

    #[test]
    fn display_matches_wire_value() {
        assert_eq!(StateResult::Success.to_string(), "success");
        assert_eq!(StateResult::Timeout.to_string(), "timeout");
    }

    #[test]
    fn serializes_to_lowercase() {
        let json = serde_json::to_string(&StateResult::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");

        let back: StateResult = serde_json::from_str("\"retry\"").unwrap();
        assert_eq!(back, StateResult::Retry);
    }
}
