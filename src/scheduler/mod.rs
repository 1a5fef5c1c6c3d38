//! Threshold/interval trigger scheduling
//!
//! One scheduler owns both trigger conditions for an action kind: a
//! count-based threshold (N accumulated changes) and a wall-clock interval
//! (T elapsed since the last fire). An in-flight guard enforces at most one
//! running action per kind; a trigger that lands while the previous action is
//! still running stays armed and fires on a later poll instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trigger thresholds for one action kind
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Fire unconditionally once this much time has passed since the last fire
    pub interval: Duration,
    /// Fire once this many changes have accumulated
    pub max_changes: u32,
    /// How often the watch loop re-polls the change source
    pub poll_period: Duration,
}

impl ScheduleConfig {
    /// Backup action defaults: every 30 minutes or 10 changes, 5 s polls
    pub fn backup_defaults() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            max_changes: 10,
            poll_period: Duration::from_secs(5),
        }
    }

    /// Sync action defaults: every 60 minutes or 20 changes, 30 s polls
    pub fn sync_defaults() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            max_changes: 20,
            poll_period: Duration::from_secs(30),
        }
    }
}

/// Why an action was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The change-count threshold was reached (carries the observed count)
    Threshold(u32),
    /// The wall-clock interval elapsed
    Interval,
    /// Explicit user request
    Manual,
    /// Final invocation from the shutdown hook
    Shutdown,
}

/// Cleared when dropped, releasing the scheduler for the next trigger
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Trigger state for one action kind
pub struct Scheduler {
    config: ScheduleConfig,
    change_count: u32,
    last_fire: Instant,
    in_flight: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    /// Construct with an explicit start instant (the interval clock starts
    /// here, so the first interval fire happens one full interval later)
    pub fn new_at(config: ScheduleConfig, now: Instant) -> Self {
        Self {
            config,
            change_count: 0,
            last_fire: now,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Accumulate changes reported by a change source
    pub fn record_changes(&mut self, count: usize) {
        self.change_count = self.change_count.saturating_add(count as u32);
    }

    pub fn pending_changes(&self) -> u32 {
        self.change_count
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Decide whether to fire now.
    ///
    /// On a fire the change counter resets and `last_fire` advances
    /// immediately, before the action runs: a slow action must not double
    /// trigger, and a failed action counts as attempted (no automatic retry).
    pub fn poll(&mut self, now: Instant) -> Option<TriggerReason> {
        let reason = if self.change_count >= self.config.max_changes {
            TriggerReason::Threshold(self.change_count)
        } else if now.duration_since(self.last_fire) >= self.config.interval {
            TriggerReason::Interval
        } else {
            return None;
        };

        if self.is_in_flight() {
            // Previous action of this kind still running; stay armed.
            return None;
        }

        self.change_count = 0;
        self.last_fire = now;
        Some(reason)
    }

    /// Mark an action as started; the returned guard releases on drop
    pub fn begin(&self) -> InFlightGuard {
        self.in_flight.store(true, Ordering::Release);
        InFlightGuard {
            flag: self.in_flight.clone(),
        }
    }
}
