//! Periodic counter with consistent cadence.
//!
//! A [`PeriodicCounter`] owns exactly one recurring timer while running and
//! increments its value by one per tick. The tick handler always acts on the
//! value current at fire time, so the timer is created once per `start()` and
//! never recreated because the value changed.
//!
//! - **Timers** ([`timer`], [`manual_clock`], [`thread_timer`]): the wake-up
//!   facility seam, a deterministic simulated clock, and thread-backed timers
//! - **Observers** ([`observers`]): subscription registry with scoped release
//! - **Counter** ([`counter`]): the periodic counter itself
//! - **Variants** ([`variants`]): the stale-capture and resubscribing baselines
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use counter_core::{ManualClock, PeriodicCounter};
//!
//! let clock = Arc::new(ManualClock::new());
//! let counter = PeriodicCounter::new(1000, clock.clone()).unwrap();
//!
//! counter.start().unwrap();
//! clock.advance(Duration::from_millis(3000));
//! assert_eq!(counter.value(), 3);
//!
//! counter.stop();
//! clock.advance(Duration::from_millis(3000));
//! assert_eq!(counter.value(), 3);
//! ```

pub mod counter;
pub mod manual_clock;
pub mod observers;
pub mod thread_timer;
pub mod timer;
pub mod variants;

// Re-export main types for convenience
pub use counter::{DiscardReason, PeriodicCounter, TickOutcome};
pub use manual_clock::{ManualClock, PendingTick};
pub use observers::{Observer, ObserverId, ObserverRegistry, Subscription};
pub use thread_timer::ThreadTimer;
pub use timer::{TickCallback, TimerFacility, TimerHandle};
pub use variants::{build_variant, CounterVariant, ResubscribingCounter, StaleCaptureCounter};
