//! Stale-capture regression tests.
//!
//! # Acceptance Criteria
//!
//! - A schedule-once timer over a captured value reports 1 forever
//! - Recreating the timer on every change gives correct values but
//!   allocates a handle per tick
//! - Both fresh-read strategies count correctly with a single handle,
//!   including after an external reset

use super::common::{simulated_counter, SECOND, STRATEGIES};
use counter_common::config::{CounterConfig, VariantKind};
use counter_common::time::TickInterval;
use counter_core::{build_variant, CounterVariant, ManualClock, StaleCaptureCounter};
use std::sync::{Arc, Mutex};

fn interval() -> TickInterval {
    TickInterval::from_millis(1000).unwrap()
}

fn config() -> CounterConfig {
    CounterConfig {
        interval: SECOND,
        ..Default::default()
    }
}

#[test]
fn test_stale_capture_reports_one_forever() {
    let clock = Arc::new(ManualClock::new());
    let counter = StaleCaptureCounter::new(interval(), clock.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = counter.observe(Arc::new(move |v| sink.lock().unwrap().push(v)));

    counter.start().unwrap();
    clock.advance(SECOND * 30);

    assert_eq!(counter.value(), 1);
    assert_eq!(seen.lock().unwrap().len(), 30);
    assert!(seen.lock().unwrap().iter().all(|v| *v == 1));
}

#[test]
fn test_resubscribing_churns_one_handle_per_tick() {
    let clock = Arc::new(ManualClock::new());
    let counter = build_variant(VariantKind::Resubscribing, &config(), clock.clone()).unwrap();
    counter.start().unwrap();

    clock.advance(SECOND * 10);

    assert_eq!(counter.value(), 10);
    assert_eq!(clock.created_count(), 11);
    assert_eq!(counter.metrics().timers_created, 11);
}

#[test]
fn test_fresh_strategies_keep_one_handle() {
    for kind in [VariantKind::StableSetter, VariantKind::LatestRef] {
        let clock = Arc::new(ManualClock::new());
        let counter = build_variant(kind, &config(), clock.clone()).unwrap();
        counter.start().unwrap();

        clock.advance(SECOND * 10);

        assert_eq!(counter.value(), 10, "{kind}");
        assert_eq!(clock.created_count(), 1, "{kind}");
    }
}

#[test]
fn test_reset_is_seen_at_fire_time() {
    for strategy in STRATEGIES {
        let (clock, counter) = simulated_counter(strategy);
        counter.start().unwrap();
        clock.advance(SECOND * 5);

        counter.reset();
        clock.advance(SECOND * 2);

        assert_eq!(counter.value(), 2, "strategy {strategy}");
    }
}
