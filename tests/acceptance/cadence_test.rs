//! Cadence acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - After N ticks the value is N, with no skips or resets
//! - Exactly one timer handle exists for a whole start/stop run
//! - A 5000ms step at a 1000ms interval delivers exactly 5 ordered ticks
//! - Restarting resumes from the held value

use super::common::{simulated_counter, Recorder, SECOND, STRATEGIES};
use counter_common::config::{RestartPolicy, StartPolicy};
use counter_common::error::CounterError;
use counter_common::state::CounterState;
use std::time::Duration;
use counter_core::TimerFacility;

#[test]
fn test_value_equals_elapsed_ticks() {
    for strategy in STRATEGIES {
        let (clock, counter) = simulated_counter(strategy);
        counter.start().unwrap();

        for n in 1..=50 {
            clock.advance(SECOND);
            assert_eq!(counter.value(), n, "strategy {strategy} after {n} ticks");
        }
    }
}

#[test]
fn test_one_timer_handle_per_run() {
    for strategy in STRATEGIES {
        let (clock, counter) = simulated_counter(strategy);
        counter.start().unwrap();

        for _ in 0..20 {
            clock.advance(SECOND);
            assert_eq!(clock.active_timers(), 1);
            assert_eq!(clock.created_count(), 1, "no handle allocated on tick");
        }

        counter.stop();
        assert_eq!(clock.active_timers(), 0);
        assert_eq!(counter.metrics().timers_created(), 1);
        assert_eq!(counter.metrics().timers_released(), 1);
    }
}

#[test]
fn test_single_large_step_delivers_each_tick() {
    for strategy in STRATEGIES {
        let (clock, counter) = simulated_counter(strategy);
        let (recorder, _sub) = Recorder::attach(&counter);
        counter.start().unwrap();

        let fired = clock.advance(Duration::from_millis(5000));

        assert_eq!(fired, 5);
        assert_eq!(recorder.values(), vec![1, 2, 3, 4, 5]);
        assert_eq!(counter.value(), 5);
    }
}

#[test]
fn test_restart_resumes_from_held_value() {
    let (clock, counter) = simulated_counter(Default::default());
    counter.start().unwrap();
    clock.advance(SECOND * 7);
    counter.stop();
    assert_eq!(counter.state(), CounterState::Idle);

    counter.start().unwrap();
    clock.advance(SECOND * 3);
    assert_eq!(counter.value(), 10);
}

#[test]
fn test_restart_policy_reset() {
    let (clock, counter) = simulated_counter(Default::default());
    let counter = counter.with_restart_policy(RestartPolicy::Reset);
    counter.start().unwrap();
    clock.advance(SECOND * 7);
    counter.stop();

    counter.start().unwrap();
    clock.advance(SECOND * 3);
    assert_eq!(counter.value(), 3);
}

#[test]
fn test_start_policies() {
    let (clock, counter) = simulated_counter(Default::default());
    counter.start().unwrap();
    assert_eq!(counter.start(), Err(CounterError::AlreadyStarted));

    let counter = counter.with_start_policy(StartPolicy::Ignore);
    assert_eq!(counter.start(), Ok(()));
    assert_eq!(clock.created_count(), 1);
}
