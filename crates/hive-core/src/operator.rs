//! Operator control state for the running tick loop.
//!
//! Shared between the loop and whatever admin surface drives it. All
//! control fields are atomics so the loop reads them without locks on the
//! hot path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify};

/// Smallest tick interval an operator may set.
pub const MIN_TICK_INTERVAL_MS: u64 = 50;

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStopReason {
    /// The configured `max_ticks` were processed.
    MaxTicksReached,
    /// An operator requested a stop.
    OperatorStop,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the loop is paused by the operator.
    paused: AtomicBool,

    /// Wakes the loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Last tick that completed, 0 before the first.
    last_tick: AtomicU64,

    /// Wall-clock time the loop started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Why the loop stopped, once it has.
    stop_reason: Mutex<Option<EngineStopReason>>,
}

impl OperatorState {
    /// Operator state for a loop running every `tick_interval_ms` for at
    /// most `max_ticks` ticks.
    pub fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            last_tick: AtomicU64::new(0),
            started_at: Utc::now(),
            max_ticks,
            stop_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the operator paused the loop.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause before the next tick.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the loop is no longer paused, or a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop after the current tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why the loop stopped.
    pub async fn set_stop_reason(&self, reason: EngineStopReason) {
        *self.stop_reason.lock().await = Some(reason);
    }

    /// Why the loop stopped, if it has.
    pub async fn stop_reason(&self) -> Option<EngineStopReason> {
        *self.stop_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick speed
    // -----------------------------------------------------------------------

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval. Returns the previous interval, or `None`
    /// when `ms` is below [`MIN_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Record a completed tick.
    pub fn record_tick(&self, tick: u64) {
        self.last_tick.store(tick, Ordering::Release);
    }

    /// Whether `ticks_run` ticks exhaust the configured limit.
    pub const fn tick_limit_reached(&self, ticks_run: u64) -> bool {
        self.max_ticks > 0 && ticks_run >= self.max_ticks
    }

    /// Configured tick limit.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Seconds since the loop started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Point-in-time status for admin surfaces.
    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            last_tick: self.last_tick.load(Ordering::Acquire),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            stop_reason: self.stop_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable loop status.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Last completed tick.
    pub last_tick: u64,
    /// Whether the operator paused the loop.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Seconds since start.
    pub elapsed_seconds: u64,
    /// Configured tick limit (0 = unlimited).
    pub max_ticks: u64,
    /// Why the loop stopped, if it has.
    pub stop_reason: Option<EngineStopReason>,
    /// RFC 3339 start time.
    pub started_at: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(1000, 0);
        assert!(!state.is_paused());
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn tick_interval_has_a_floor() {
        let state = OperatorState::new(1000, 0);
        assert_eq!(state.set_tick_interval_ms(200), Some(1000));
        assert_eq!(state.tick_interval_ms(), 200);
        assert_eq!(state.set_tick_interval_ms(10), None);
        assert_eq!(state.tick_interval_ms(), 200);
    }

    #[test]
    fn zero_tick_limit_is_unlimited() {
        assert!(!OperatorState::new(1000, 0).tick_limit_reached(1_000_000));
        let bounded = OperatorState::new(1000, 3);
        assert!(!bounded.tick_limit_reached(2));
        assert!(bounded.tick_limit_reached(3));
    }

    #[tokio::test]
    async fn resume_wakes_a_paused_waiter() {
        let state = Arc::new(OperatorState::new(1000, 0));
        state.pause();
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.wait_if_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        state.resume();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn status_reports_progress() {
        let state = OperatorState::new(500, 10);
        state.record_tick(42);
        state.set_stop_reason(EngineStopReason::OperatorStop).await;
        let status = state.status().await;
        assert_eq!(status.last_tick, 42);
        assert_eq!(status.tick_interval_ms, 500);
        assert_eq!(status.stop_reason, Some(EngineStopReason::OperatorStop));
    }
}
