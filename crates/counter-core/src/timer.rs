//! Recurring wake-up facility and its RAII handle.
//!
//! The counter never sleeps or waits itself: the wait between ticks belongs
//! to a [`TimerFacility`]. Implementations must invoke callbacks without
//! holding any internal lock, so a callback may set or clear intervals.

use counter_common::error::CounterResult;
use counter_common::time::TimerId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked on every wake-up of an interval.
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// A source of repeated wake-ups.
pub trait TimerFacility: Send + Sync {
    /// Register `callback` to run every `period` until cleared.
    ///
    /// # Errors
    ///
    /// Returns [`counter_common::CounterError::Timer`] if the wake-up cannot
    /// be scheduled.
    fn set_interval(&self, period: Duration, callback: TickCallback) -> CounterResult<TimerId>;

    /// Cancel an interval. Unknown or already cleared ids are ignored.
    fn clear_interval(&self, id: TimerId);

    /// Number of intervals currently registered.
    fn active_timers(&self) -> usize;
}

/// Owned handle to one live interval.
///
/// The interval is cleared exactly once, by [`TimerHandle::cancel`] or on drop.
pub struct TimerHandle {
    id: TimerId,
    facility: Arc<dyn TimerFacility>,
    released: bool,
}

impl TimerHandle {
    /// Schedule `callback` every `period` on `facility`.
    ///
    /// # Errors
    ///
    /// Returns [`counter_common::error::CounterError::Timer`] if the facility
    /// cannot create the interval.
    pub fn schedule(
        facility: &Arc<dyn TimerFacility>,
        period: Duration,
        callback: TickCallback,
    ) -> CounterResult<Self> {
        let id = facility.set_interval(period, callback)?;
        Ok(Self {
            id,
            facility: Arc::clone(facility),
            released: false,
        })
    }

    /// Identifier assigned by the facility.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Release the interval now.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.facility.clear_interval(self.id);
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
