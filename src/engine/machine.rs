//! The execution engine: drives states from the initial state to a
//! terminal state, enforcing retries, timeouts, failover and the watchdog.

use super::context::ExecutionContext;
use super::error::RunError;
use super::watchdog::{Watchdog, WatchdogPolicy};
use crate::core::{History, HistoryEntry, State, StateMetadata, StateResult, TransitionTable};
use chrono::Utc;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Handler invoked once per state attempt.
pub type Handler<S> = Arc<dyn Fn(&ExecutionContext<S>) -> StateResult + Send + Sync>;

/// How a completed run ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunOutcome {
    /// A terminal state was reached without ever failing over.
    Completed,
    /// A terminal state was reached, but at least one failover redirect
    /// happened along the way.
    CompletedViaFailover,
    /// The watchdog expired under [`WatchdogPolicy::Stop`].
    WatchdogStopped,
}

/// Summary returned by a run that did not error.
#[derive(Clone, Debug)]
pub struct RunReport<S: State> {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// The state the machine stopped at.
    pub final_state: S,
    /// Total handler invocations this run, retries included.
    pub attempts: usize,
}

/// A finite-state execution engine.
///
/// Constructed through [`StateMachineBuilder`](super::StateMachineBuilder)
/// with its full static configuration; the configuration is immutable
/// thereafter. One instance owns its current state, retry counters and
/// history exclusively, and is driven from a single control thread.
///
/// # Timeouts are deadline waits, not preemption
///
/// When a state has a timeout, its handler runs on a background thread and
/// the engine waits for the result with a deadline. If the deadline
/// elapses first, the engine records [`StateResult::Timeout`] and moves on
/// to recovery — but the handler is not forcibly halted, and its side
/// effects may still land after the engine has advanced (for example into
/// the failover state). Handlers that mutate shared state must tolerate
/// that.
pub struct StateMachine<S: State> {
    metadata: HashMap<S, StateMetadata<S>>,
    table: TransitionTable<S>,
    handlers: HashMap<S, Handler<S>>,
    initial: S,
    current: S,
    retry_counts: HashMap<S, u32>,
    history: History<S>,
    watchdog: Watchdog,
    watchdog_policy: WatchdogPolicy,
    clear_history_on_reset: bool,
    max_steps: usize,
}

impl<S: State> StateMachine<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        metadata: HashMap<S, StateMetadata<S>>,
        table: TransitionTable<S>,
        handlers: HashMap<S, Handler<S>>,
        initial: S,
        history_capacity: Option<usize>,
        max_steps: usize,
        watchdog_policy: WatchdogPolicy,
        clear_history_on_reset: bool,
    ) -> Self {
        let history = match history_capacity {
            Some(capacity) => History::with_capacity(capacity),
            None => History::unbounded(),
        };
        Self {
            metadata,
            table,
            handlers,
            current: initial.clone(),
            initial,
            retry_counts: HashMap::new(),
            history,
            watchdog: Watchdog::new(),
            watchdog_policy,
            clear_history_on_reset,
            max_steps,
        }
    }

    /// Run the machine until a terminal state is reached or a failure
    /// escalates past every configured recovery path.
    ///
    /// Retry counters are cleared on entry, so a machine can be re-run
    /// after [`reset`](Self::reset). Each iteration is one attempt at the
    /// current state: watchdog pre-check, handler invocation under the
    /// state's deadline, history append, watchdog post-check, then either
    /// a transition, a retry, a failover, or termination.
    pub fn run(&mut self) -> Result<RunReport<S>, RunError> {
        self.retry_counts.clear();
        self.retry_counts.insert(self.current.clone(), 0);

        let mut attempts_total = 0usize;
        let mut failed_over = false;

        loop {
            if let Some(report) = self.watchdog_outcome(attempts_total)? {
                return Ok(report);
            }
            if attempts_total >= self.max_steps {
                return Err(RunError::StepLimit {
                    limit: self.max_steps,
                });
            }

            let state = self.current.clone();
            let (max_retries, timeout, failover) = match self.metadata.get(&state) {
                Some(meta) => (
                    meta.max_retries,
                    meta.timeout,
                    meta.failover_state.clone(),
                ),
                None => {
                    return Err(RunError::MissingMetadata {
                        state: state.name().to_string(),
                    })
                }
            };
            let handler = match self.handlers.get(&state) {
                Some(handler) => Arc::clone(handler),
                None => {
                    return Err(RunError::MissingHandler {
                        state: state.name().to_string(),
                    })
                }
            };

            let attempt = self.retry_counts.get(&state).copied().unwrap_or(0) + 1;
            tracing::info!(
                state = state.name(),
                attempt,
                max_attempts = max_retries + 1,
                "executing state"
            );

            let ctx = ExecutionContext::new(state.clone(), attempt, self.watchdog.clone());
            let timestamp = Utc::now();
            let started = Instant::now();
            let (result, error) = match invoke_handler(&handler, ctx, timeout, &self.watchdog) {
                Invocation::Finished(result, error) => (result, error),
                // The watchdog ran out while the loop was still waiting on
                // the handler; the attempt produced no result to record.
                Invocation::WatchdogExpired => match self.watchdog_outcome(attempts_total)? {
                    Some(report) => return Ok(report),
                    None => continue,
                },
            };
            let duration = started.elapsed();
            attempts_total += 1;

            self.history.push(HistoryEntry {
                state: state.clone(),
                result,
                attempt,
                timestamp,
                duration,
                error,
            });
            tracing::info!(
                state = state.name(),
                result = %result,
                elapsed_ms = duration.as_millis() as u64,
                "attempt finished"
            );

            // A long handler may have aged the watchdog past its threshold
            // while the loop was waiting on it.
            if let Some(report) = self.watchdog_outcome(attempts_total)? {
                return Ok(report);
            }

            if result.is_success_like() {
                self.retry_counts.insert(state.clone(), 0);
                let next = self.table.next_state(&state)?.cloned();
                match next {
                    Some(next) => {
                        tracing::info!(from = state.name(), to = next.name(), "transition");
                        self.retry_counts.insert(next.clone(), 0);
                        self.current = next;
                    }
                    None => {
                        tracing::info!(state = state.name(), "no further transitions, run complete");
                        return Ok(RunReport {
                            outcome: if failed_over {
                                RunOutcome::CompletedViaFailover
                            } else {
                                RunOutcome::Completed
                            },
                            final_state: state,
                            attempts: attempts_total,
                        });
                    }
                }
            } else {
                // Failure, Retry and Timeout all count against max_retries.
                let count = {
                    let entry = self.retry_counts.entry(state.clone()).or_insert(0);
                    *entry += 1;
                    *entry
                };
                if count <= max_retries {
                    tracing::warn!(state = state.name(), result = %result, "re-attempting state");
                } else if let Some(failover) = failover {
                    tracing::warn!(
                        from = state.name(),
                        to = failover.name(),
                        attempts = count,
                        "retries exhausted, failing over"
                    );
                    self.retry_counts.insert(failover.clone(), 0);
                    self.current = failover;
                    failed_over = true;
                } else {
                    tracing::error!(
                        state = state.name(),
                        attempts = count,
                        last_result = %result,
                        "retries exhausted with no failover"
                    );
                    return Err(RunError::StatesExhausted {
                        state: state.name().to_string(),
                        attempts: count,
                        last_result: result,
                    });
                }
            }
        }
    }

    /// The state the machine is currently at.
    pub fn current_state(&self) -> &S {
        &self.current
    }

    /// Metadata registered for a state, if it was declared.
    pub fn metadata_for(&self, state: &S) -> Option<&StateMetadata<S>> {
        self.metadata.get(state)
    }

    /// The execution history.
    pub fn history(&self) -> &History<S> {
        &self.history
    }

    /// Arm the idle watchdog. If no activity is recorded within
    /// `threshold`, the next check ends the run according to the
    /// configured [`WatchdogPolicy`].
    pub fn enable_watchdog(&self, threshold: Duration) {
        self.watchdog.arm(threshold);
    }

    /// Disarm the idle watchdog.
    pub fn disable_watchdog(&self) {
        self.watchdog.disarm();
    }

    /// Record progress from outside a handler. Handlers use
    /// [`ExecutionContext::record_activity`] instead.
    pub fn record_activity(&self) {
        self.watchdog.record_activity();
    }

    /// Restore the initial state and zero all retry counters.
    ///
    /// The watchdog arm state persists. History is retained unless the
    /// machine was built with `clear_history_on_reset(true)`.
    pub fn reset(&mut self) {
        self.current = self.initial.clone();
        self.retry_counts.clear();
        if self.clear_history_on_reset {
            self.history.clear();
        }
        tracing::info!(state = self.initial.name(), "machine reset");
    }

    fn watchdog_outcome(&self, attempts: usize) -> Result<Option<RunReport<S>>, RunError> {
        let now = Instant::now();
        if !self.watchdog.expired_at(now) {
            return Ok(None);
        }
        let (idle, threshold) = self
            .watchdog
            .status_at(now)
            .unwrap_or((Duration::ZERO, Duration::ZERO));
        tracing::error!(
            idle_ms = idle.as_millis() as u64,
            threshold_ms = threshold.as_millis() as u64,
            "watchdog expired"
        );
        match self.watchdog_policy {
            WatchdogPolicy::Propagate => Err(RunError::WatchdogExpired { idle, threshold }),
            WatchdogPolicy::Stop => Ok(Some(RunReport {
                outcome: RunOutcome::WatchdogStopped,
                final_state: self.current.clone(),
                attempts,
            })),
        }
    }
}

/// How a single handler invocation resolved from the engine's view.
enum Invocation {
    /// The handler produced a result (or the attempt timed out / panicked,
    /// both of which map onto a result plus an error message).
    Finished(StateResult, Option<String>),
    /// The watchdog expired while the engine was still waiting; no result
    /// was produced and no history entry is owed.
    WatchdogExpired,
}

/// Invoke a handler, bounding the wait when a deadline applies.
///
/// With neither a state timeout nor an armed watchdog, the handler runs
/// inline on the loop thread. Otherwise it runs on a spawned thread and
/// the engine waits on a channel, waking at whichever deadline comes
/// first: the state timeout (the attempt becomes
/// [`StateResult::Timeout`]) or the watchdog threshold (no result; the
/// run ends per policy). Either way the worker thread is left running
/// detached — the engine stops waiting, it does not preempt. A panicking
/// handler is recorded as [`StateResult::Failure`] with the panic message.
fn invoke_handler<S: State>(
    handler: &Handler<S>,
    ctx: ExecutionContext<S>,
    timeout: Option<Duration>,
    watchdog: &Watchdog,
) -> Invocation {
    let now = Instant::now();
    if timeout.is_none() && watchdog.status_at(now).is_none() {
        return match catch_unwind(AssertUnwindSafe(|| handler(&ctx))) {
            Ok(result) => Invocation::Finished(result, None),
            Err(payload) => {
                Invocation::Finished(StateResult::Failure, Some(panic_message(payload)))
            }
        };
    }

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(handler);
    thread::spawn(move || {
        let outcome = catch_unwind(AssertUnwindSafe(|| worker(&ctx)));
        let _ = tx.send(outcome.map_err(panic_message));
    });

    let started = Instant::now();
    loop {
        let now = Instant::now();

        let state_remaining =
            timeout.map(|t| t.saturating_sub(now.saturating_duration_since(started)));
        if let (Some(deadline), Some(remaining)) = (timeout, state_remaining) {
            if remaining.is_zero() {
                return Invocation::Finished(
                    StateResult::Timeout,
                    Some(format!("no result within {deadline:?}")),
                );
            }
        }

        if watchdog.expired_at(now) {
            return Invocation::WatchdogExpired;
        }
        let watchdog_remaining = watchdog
            .status_at(now)
            .map(|(idle, threshold)| threshold.saturating_sub(idle));

        // Wake at the nearest deadline; the 1ms floor avoids a busy loop
        // right at the watchdog's strict-greater-than boundary.
        let wait = [state_remaining, watchdog_remaining]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(Duration::MAX)
            .max(Duration::from_millis(1));

        match rx.recv_timeout(wait) {
            Ok(Ok(result)) => return Invocation::Finished(result, None),
            Ok(Err(message)) => {
                return Invocation::Finished(StateResult::Failure, Some(message))
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Invocation::Finished(
                    StateResult::Failure,
                    Some("handler thread exited without a result".to_string()),
                )
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
