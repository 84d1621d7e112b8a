//! Idle watchdog: aborts a run when no progress is recorded in time.
//!
//! The watchdog measures wall-clock progress, not attempt count. Arming it
//! resets the last-activity timestamp; only an explicit
//! [`Watchdog::record_activity`] call resets it afterwards. A handler that
//! runs long without signalling progress ages the watchdog even if it
//! eventually returns success.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// What the engine does when the watchdog threshold is crossed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum WatchdogPolicy {
    /// `run()` returns `Err(RunError::WatchdogExpired { .. })`.
    #[default]
    Propagate,
    /// `run()` ends with `Ok` and `RunOutcome::WatchdogStopped`.
    Stop,
}

#[derive(Debug)]
struct WatchdogState {
    threshold: Option<Duration>,
    last_activity: Instant,
    warned: bool,
}

/// Liveness monitor shared between the engine loop and handler contexts.
///
/// Cloning yields a handle onto the same monitor, so a handler running on
/// the timeout worker thread can record activity while the engine loop
/// waits. Disarmed by default.
#[derive(Clone, Debug)]
pub struct Watchdog {
    inner: Arc<Mutex<WatchdogState>>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Create a disarmed watchdog.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(WatchdogState {
                threshold: None,
                last_activity: Instant::now(),
                warned: false,
            })),
        }
    }

    /// Arm the watchdog. Resets the last-activity timestamp to now.
    pub fn arm(&self, threshold: Duration) {
        let mut state = self.lock();
        state.threshold = Some(threshold);
        state.last_activity = Instant::now();
        state.warned = false;
        tracing::info!(threshold_ms = threshold.as_millis() as u64, "watchdog armed");
    }

    /// Disarm the watchdog.
    pub fn disarm(&self) {
        self.lock().threshold = None;
    }

    /// Record progress, resetting the idle clock.
    pub fn record_activity(&self) {
        let mut state = self.lock();
        state.last_activity = Instant::now();
        state.warned = false;
    }

    /// True iff armed and more than the threshold has elapsed since the
    /// last recorded activity. Emits a one-shot warning once 80% of the
    /// threshold has elapsed.
    pub fn expired_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        let Some(threshold) = state.threshold else {
            return false;
        };

        let idle = now.saturating_duration_since(state.last_activity);
        if idle > threshold {
            return true;
        }

        if !state.warned && idle >= threshold.mul_f64(0.8) {
            state.warned = true;
            let remaining = threshold - idle;
            tracing::warn!(
                idle_ms = idle.as_millis() as u64,
                remaining_ms = remaining.as_millis() as u64,
                "watchdog nearing threshold"
            );
        }
        false
    }

    /// Idle time and threshold, when armed. Used to report expiry detail.
    pub(crate) fn status_at(&self, now: Instant) -> Option<(Duration, Duration)> {
        let state = self.lock();
        state
            .threshold
            .map(|threshold| (now.saturating_duration_since(state.last_activity), threshold))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WatchdogState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_watchdog_never_expires() {
        let watchdog = Watchdog::new();
        let later = Instant::now() + Duration::from_secs(3600);
        assert!(!watchdog.expired_at(later));
    }

    #[test]
    fn armed_watchdog_expires_past_threshold() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_millis(10));

        assert!(!watchdog.expired_at(Instant::now()));
        assert!(watchdog.expired_at(Instant::now() + Duration::from_millis(50)));
    }

    #[test]
    fn expiry_is_strictly_greater_than_threshold() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_secs(60));

        // Exactly at the threshold is not yet expired.
        assert!(!watchdog.expired_at(Instant::now()));
    }

    #[test]
    fn record_activity_resets_idle_clock() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_millis(20));

        std::thread::sleep(Duration::from_millis(5));
        watchdog.record_activity();

        assert!(!watchdog.expired_at(Instant::now() + Duration::from_millis(10)));
        assert!(watchdog.expired_at(Instant::now() + Duration::from_millis(60)));
    }

    #[test]
    fn disarm_clears_threshold() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_millis(1));
        watchdog.disarm();

        assert!(!watchdog.expired_at(Instant::now() + Duration::from_secs(10)));
        assert!(watchdog.status_at(Instant::now()).is_none());
    }

    #[test]
    fn rearm_resets_last_activity() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(15));

        watchdog.arm(Duration::from_millis(10));
        assert!(!watchdog.expired_at(Instant::now()));
    }

    #[test]
    fn clones_share_the_same_monitor() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_millis(20));

        let handle = watchdog.clone();
        std::thread::sleep(Duration::from_millis(5));
        handle.record_activity();

        assert!(!watchdog.expired_at(Instant::now() + Duration::from_millis(10)));
    }

    #[test]
    fn status_reports_idle_and_threshold() {
        let watchdog = Watchdog::new();
        watchdog.arm(Duration::from_secs(5));

        let (idle, threshold) = watchdog.status_at(Instant::now()).unwrap();
        assert!(idle < Duration::from_secs(1));
        assert_eq!(threshold, Duration::from_secs(5));
    }
}
