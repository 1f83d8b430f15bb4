//! Deterministic simulated clock.
//!
//! Time only moves when [`ManualClock::advance`] is called. Due ticks fire in
//! order of (due time, timer id), and the clock's `now` is set to each tick's
//! due time before its callback runs, so intervals registered from inside a
//! callback are anchored at the firing instant.

use crate::timer::{TickCallback, TimerFacility};
use counter_common::error::CounterResult;
use counter_common::time::TimerId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

struct Entry {
    period: Duration,
    next_due: Duration,
    callback: TickCallback,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_id: u64,
    created: u64,
    timers: BTreeMap<TimerId, Entry>,
}

/// Simulated timer facility driven by explicit time advancement.
#[derive(Default)]
pub struct ManualClock {
    state: Mutex<ClockState>,
}

/// A tick that came due but has not been delivered yet.
///
/// Models a wake-up already in flight at the scheduling layer. Firing it
/// after the owning interval was cleared still runs the callback, which is
/// exactly the race a counter must tolerate.
pub struct PendingTick {
    timer: TimerId,
    due: Duration,
    callback: TickCallback,
}

impl PendingTick {
    /// Interval that produced this tick.
    #[must_use]
    pub fn timer(&self) -> TimerId {
        self.timer
    }

    /// Simulated time at which the tick came due.
    #[must_use]
    pub fn due(&self) -> Duration {
        self.due
    }

    /// Deliver the tick.
    pub fn fire(self) {
        (self.callback)();
    }
}

impl fmt::Debug for PendingTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTick")
            .field("timer", &self.timer)
            .field("due", &self.due)
            .finish_non_exhaustive()
    }
}

impl ManualClock {
    /// Create a clock at time zero with no intervals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Total intervals ever registered on this clock.
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.lock().created
    }

    /// Advance time by `by`, firing every tick that comes due.
    ///
    /// Returns the number of ticks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now + by;
        let mut fired = 0;

        while let Some(tick) = self.pop_due(target) {
            trace!(timer = %tick.timer, due_ms = tick.due.as_millis(), "Firing simulated tick");
            tick.fire();
            fired += 1;
        }

        self.settle(target);
        fired
    }

    /// Advance time by `by`, collecting due ticks without delivering them.
    pub fn advance_deferred(&self, by: Duration) -> Vec<PendingTick> {
        let target = self.lock().now + by;
        let mut pending = Vec::new();

        while let Some(tick) = self.pop_due(target) {
            pending.push(tick);
        }

        self.settle(target);
        pending
    }

    fn settle(&self, target: Duration) {
        let mut state = self.lock();
        state.now = state.now.max(target);
    }

    /// Take the earliest tick due at or before `target` and reschedule its interval.
    fn pop_due(&self, target: Duration) -> Option<PendingTick> {
        let mut state = self.lock();

        let (timer, due) = state
            .timers
            .iter()
            .filter(|(_, entry)| entry.next_due <= target)
            .min_by_key(|(id, entry)| (entry.next_due, **id))
            .map(|(id, entry)| (*id, entry.next_due))?;

        state.now = due;
        let entry = state.timers.get_mut(&timer)?;
        entry.next_due += entry.period;

        Some(PendingTick {
            timer,
            due,
            callback: TickCallback::clone(&entry.callback),
        })
    }
}

impl TimerFacility for ManualClock {
    fn set_interval(&self, period: Duration, callback: TickCallback) -> CounterResult<TimerId> {
        let mut state = self.lock();
        state.next_id += 1;
        state.created += 1;

        let id = TimerId(state.next_id);
        let next_due = state.now + period;
        state.timers.insert(
            id,
            Entry {
                period,
                next_due,
                callback,
            },
        );
        Ok(id)
    }

    fn clear_interval(&self, id: TimerId) {
        self.lock().timers.remove(&id);
    }

    fn active_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualClock")
            .field("now", &state.now)
            .field("active_timers", &state.timers.len())
            .field("created", &state.created)
            .finish()
    }
}
