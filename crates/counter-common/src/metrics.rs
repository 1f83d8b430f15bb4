//! Tick instrumentation.
//!
//! Counters are plain atomics so tick callbacks running on a timer thread
//! can record without taking any lock. Discarded late ticks are only ever
//! visible through these numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Resource and delivery counters for one counter instance.
#[derive(Debug, Default)]
pub struct TickMetrics {
    timers_created: AtomicU64,
    timers_released: AtomicU64,
    ticks_delivered: AtomicU64,
    late_ticks_discarded: AtomicU64,
    notifications_sent: AtomicU64,
}

impl TickMetrics {
    /// Create a zeroed metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a timer handle being allocated.
    pub fn record_timer_created(&self) {
        self.timers_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timer handle being released.
    pub fn record_timer_released(&self) {
        self.timers_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tick that incremented the value.
    pub fn record_tick(&self) {
        self.ticks_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tick dropped because its generation was superseded.
    pub fn record_late_tick(&self) {
        self.late_ticks_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one observer invocation.
    pub fn record_notification(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Total timer handles ever allocated.
    #[must_use]
    pub fn timers_created(&self) -> u64 {
        self.timers_created.load(Ordering::Relaxed)
    }

    /// Total timer handles released.
    #[must_use]
    pub fn timers_released(&self) -> u64 {
        self.timers_released.load(Ordering::Relaxed)
    }

    /// Handles currently live.
    #[must_use]
    pub fn live_timers(&self) -> u64 {
        self.timers_created().saturating_sub(self.timers_released())
    }

    /// Ticks that produced a new value.
    #[must_use]
    pub fn ticks_delivered(&self) -> u64 {
        self.ticks_delivered.load(Ordering::Relaxed)
    }

    /// Ticks silently dropped after a stop or restart.
    #[must_use]
    pub fn late_ticks_discarded(&self) -> u64 {
        self.late_ticks_discarded.load(Ordering::Relaxed)
    }

    /// Observer invocations across all ticks.
    #[must_use]
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Copy the current values into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timers_created: self.timers_created(),
            timers_released: self.timers_released(),
            live_timers: self.live_timers(),
            ticks_delivered: self.ticks_delivered(),
            late_ticks_discarded: self.late_ticks_discarded(),
            notifications_sent: self.notifications_sent(),
        }
    }
}

/// Point-in-time copy of [`TickMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Timer handles ever allocated.
    pub timers_created: u64,
    /// Timer handles released.
    pub timers_released: u64,
    /// Handles live at snapshot time.
    pub live_timers: u64,
    /// Ticks that produced a new value.
    pub ticks_delivered: u64,
    /// Ticks dropped by generation mismatch.
    pub late_ticks_discarded: u64,
    /// Observer invocations.
    pub notifications_sent: u64,
}
