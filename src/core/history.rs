//! Bounded, append-only execution history.
//!
//! Every handler invocation — including retried and timed-out attempts —
//! appends exactly one entry. Entries are never mutated after append; when
//! a capacity is configured, the oldest entries are evicted FIFO.

use super::result::StateResult;
use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single handler invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct HistoryEntry<S: State> {
    /// The state that was attempted.
    pub state: S,
    /// The result the engine observed for this attempt.
    pub result: StateResult,
    /// 1-based attempt number; resets each time the state is freshly entered.
    pub attempt: u32,
    /// When the attempt started.
    pub timestamp: DateTime<Utc>,
    /// How long the engine waited on the attempt. For a timed-out attempt
    /// this is roughly the configured deadline, not the handler's own
    /// (possibly still accruing) runtime.
    pub duration: Duration,
    /// Failure detail, when there is one: the timeout description or the
    /// panic message of a crashed handler.
    pub error: Option<String>,
}

impl<S: State> HistoryEntry<S> {
    /// True if the attempt completed successfully (or was skipped).
    pub fn succeeded(&self) -> bool {
        self.result.is_success_like()
    }

    /// True if the attempt failed, asked for a retry, or timed out.
    pub fn failed(&self) -> bool {
        self.result.is_failure_like()
    }
}

/// Ordered, optionally bounded log of execution entries.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{History, HistoryEntry, StateResult};
/// use chrono::Utc;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Step { Work }
///
/// impl waypoint::core::State for Step {
///     fn name(&self) -> &str { "Work" }
/// }
///
/// let mut history = History::with_capacity(2);
/// for attempt in 1..=3 {
///     history.push(HistoryEntry {
///         state: Step::Work,
///         result: StateResult::Failure,
///         attempt,
///         timestamp: Utc::now(),
///         duration: Duration::ZERO,
///         error: None,
///     });
/// }
///
/// // Capacity 2: the first attempt was evicted.
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.iter().next().unwrap().attempt, 2);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct History<S: State> {
    entries: VecDeque<HistoryEntry<S>>,
    capacity: Option<usize>,
}

impl<S: State> Default for History<S> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<S: State> History<S> {
    /// Create an unbounded history.
    pub fn unbounded() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
        }
    }

    /// Create a history that keeps at most `capacity` entries, evicting
    /// the oldest first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Append an entry, evicting the oldest if over capacity.
    pub fn push(&mut self, entry: HistoryEntry<S>) {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    /// Iterate over all entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry<S>> {
        self.entries.iter()
    }

    /// The `n` most recent entries, oldest of those first. `n` larger than
    /// the current length returns everything.
    pub fn last(&self, n: usize) -> Vec<&HistoryEntry<S>> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded (or everything was evicted).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured capacity, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Drop all retained entries. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
