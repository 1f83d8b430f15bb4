//! Lifecycle state machine for a periodic counter.
//!
//! A counter only ever moves between two states:
//! IDLE → RUNNING → IDLE
//!
//! Disposal always ends in IDLE with the timer handle released.

use crate::error::{CounterError, CounterResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterState {
    /// No timer is live.
    #[default]
    Idle,
    /// Exactly one timer is live and ticks are being delivered.
    Running,
}

impl fmt::Display for CounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
        }
    }
}

impl CounterState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: CounterState) -> bool {
        use CounterState::{Idle, Running};

        matches!((self, target), (Idle, Running) | (Running, Idle))
    }

    /// Returns true if a timer is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// State machine wrapper with transition history tracking.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    current: CounterState,
    previous: Option<CounterState>,
    transition_count: u64,
}

impl StateMachine {
    /// Create a new state machine starting in IDLE.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    #[must_use]
    pub fn state(&self) -> CounterState {
        self.current
    }

    /// Get the previous state (if any transition occurred).
    #[must_use]
    pub fn previous_state(&self) -> Option<CounterState> {
        self.previous
    }

    /// Get total number of transitions.
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt a state transition.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::InvalidStateTransition`] if `target` is not
    /// reachable from the current state.
    pub fn transition(&mut self, target: CounterState) -> CounterResult<()> {
        if self.current.can_transition_to(target) {
            self.previous = Some(self.current);
            self.current = target;
            self.transition_count += 1;
            Ok(())
        } else {
            Err(CounterError::InvalidStateTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_cycle() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.state(), CounterState::Idle);

        assert!(sm.transition(CounterState::Running).is_ok());
        assert_eq!(sm.state(), CounterState::Running);

        assert!(sm.transition(CounterState::Idle).is_ok());
        assert_eq!(sm.state(), CounterState::Idle);
        assert_eq!(sm.previous_state(), Some(CounterState::Running));

        // Restart after stop is allowed
        assert!(sm.transition(CounterState::Running).is_ok());
        assert_eq!(sm.transition_count(), 3);
    }

    #[test]
    fn test_self_transitions_rejected() {
        let mut sm = StateMachine::new();
        let err = sm.transition(CounterState::Idle).unwrap_err();
        assert_eq!(
            err,
            CounterError::InvalidStateTransition {
                from: "IDLE".into(),
                to: "IDLE".into(),
            }
        );

        sm.transition(CounterState::Running).unwrap();
        assert!(sm.transition(CounterState::Running).is_err());
        assert_eq!(sm.state(), CounterState::Running);
        assert_eq!(sm.transition_count(), 1);
    }

    #[test]
    fn test_state_serde_names() {
        let json = serde_json::to_string(&CounterState::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        assert!(CounterState::Running.is_running());
        assert!(!CounterState::Idle.is_running());
    }
}
