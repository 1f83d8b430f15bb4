//! Cancellation and observer acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - No notification after `stop()` returns, even for in-flight ticks
//! - Unsubscribing one observer leaves the others intact
//! - With no observers the value keeps advancing
//! - Dropping a running counter releases its timer

use super::common::{simulated_counter, Recorder, SECOND, STRATEGIES};
use counter_core::{PeriodicCounter, ThreadTimer, TimerFacility};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_in_flight_ticks_after_stop_are_silent() {
    for strategy in STRATEGIES {
        let (clock, counter) = simulated_counter(strategy);
        let (recorder, _sub) = Recorder::attach(&counter);
        counter.start().unwrap();
        clock.advance(SECOND * 2);

        let in_flight = clock.advance_deferred(SECOND * 3);
        counter.stop();
        for tick in in_flight {
            tick.fire();
        }

        assert_eq!(recorder.values(), vec![1, 2]);
        assert_eq!(counter.value(), 2);
        assert_eq!(counter.metrics().late_ticks_discarded(), 3);
    }
}

#[test]
fn test_unsubscribe_isolated() {
    let (clock, counter) = simulated_counter(Default::default());
    let (kept, _kept_sub) = Recorder::attach(&counter);
    let (dropped, dropped_sub) = Recorder::attach(&counter);
    counter.start().unwrap();

    clock.advance(SECOND * 2);
    dropped_sub.unsubscribe();
    clock.advance(SECOND * 2);

    assert_eq!(kept.values(), vec![1, 2, 3, 4]);
    assert_eq!(dropped.values(), vec![1, 2]);
}

#[test]
fn test_value_tracks_without_observers() {
    let (clock, counter) = simulated_counter(Default::default());
    let (recorder, sub) = Recorder::attach(&counter);
    counter.start().unwrap();
    clock.advance(SECOND);
    drop(sub);

    clock.advance(SECOND * 4);
    assert_eq!(recorder.len(), 1);
    assert_eq!(counter.value(), 5);
}

#[test]
fn test_drop_releases_timer() {
    let (clock, counter) = simulated_counter(Default::default());
    counter.start().unwrap();
    drop(counter);

    assert_eq!(clock.active_timers(), 0);
    assert_eq!(clock.advance(SECOND * 3), 0);
}

#[test]
fn test_realtime_stop_is_final() {
    for strategy in STRATEGIES {
        let timer = Arc::new(ThreadTimer::new());
        let counter = PeriodicCounter::new(1, timer.clone())
            .unwrap()
            .with_strategy(strategy);
        let (recorder, _sub) = Recorder::attach(&counter);
        counter.start().unwrap();

        let start = Instant::now();
        while counter.value() < 10 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        counter.stop();
        let at_stop = recorder.values();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(recorder.values(), at_stop);
        assert_eq!(timer.active_timers(), 0);

        let expected: Vec<i64> = (1..=at_stop.len() as i64).collect();
        assert_eq!(at_stop, expected, "strategy {strategy}");
    }
}
