//! Integration tests for periodic counter acceptance testing.
//!
//! All scenarios run on the simulated clock except the real-time ones in
//! `cancellation_test`, which use thread-backed timers with short intervals.

mod cadence_test;
mod cancellation_test;
mod common;
mod staleness_test;
