//! Common utilities for integration tests.
//!
//! Provides helpers for:
//! - Building counters on a shared simulated clock
//! - Recording delivered values

#![allow(dead_code)] // Not every helper is used by every test module

use counter_common::config::UpdateStrategy;
use counter_core::{ManualClock, PeriodicCounter, Subscription};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One second, the interval of the classic demo.
pub const SECOND: Duration = Duration::from_millis(1000);

/// Both fresh-read strategies.
pub const STRATEGIES: [UpdateStrategy; 2] =
    [UpdateStrategy::SelfReferential, UpdateStrategy::ShadowCell];

/// A counter on its own simulated clock.
pub fn simulated_counter(strategy: UpdateStrategy) -> (Arc<ManualClock>, PeriodicCounter) {
    let clock = Arc::new(ManualClock::new());
    let counter = PeriodicCounter::new(1000, clock.clone())
        .expect("1000ms is a valid interval")
        .with_strategy(strategy);
    (clock, counter)
}

/// Values delivered to one observer.
#[derive(Clone, Default)]
pub struct Recorder {
    values: Arc<Mutex<Vec<i64>>>,
}

impl Recorder {
    /// Subscribe a new recorder to `counter`.
    pub fn attach(counter: &PeriodicCounter) -> (Self, Subscription) {
        let recorder = Self::default();
        let sink = Arc::clone(&recorder.values);
        let sub = counter.subscribe(move |value| sink.lock().unwrap().push(value));
        (recorder, sub)
    }

    /// Everything delivered so far.
    pub fn values(&self) -> Vec<i64> {
        self.values.lock().unwrap().clone()
    }

    /// Number of deliveries so far.
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }
}
