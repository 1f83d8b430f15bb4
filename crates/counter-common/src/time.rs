//! Interval and tagging newtypes.

use crate::error::{CounterError, CounterResult};
use std::fmt;
use std::time::Duration;

/// A validated, strictly positive tick interval with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickInterval(Duration);

impl TickInterval {
    /// Build an interval from a millisecond count.
    ///
    /// # Errors
    ///
    /// Zero and negative values are rejected with [`CounterError::InvalidInterval`].
    pub fn from_millis(millis: i64) -> CounterResult<Self> {
        if millis <= 0 {
            return Err(CounterError::InvalidInterval(format!(
                "{millis}ms (must be a positive number of milliseconds)"
            )));
        }
        Ok(Self(Duration::from_millis(millis.unsigned_abs())))
    }

    /// Build an interval from a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::InvalidInterval`] for anything under 1ms.
    pub fn from_duration(duration: Duration) -> CounterResult<Self> {
        if duration < Duration::from_millis(1) {
            return Err(CounterError::InvalidInterval(format!(
                "{} (must be at least 1ms)",
                humantime::format_duration(duration)
            )));
        }
        Ok(Self(duration))
    }

    /// The interval as a [`Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Whole milliseconds in the interval.
    #[must_use]
    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl TryFrom<Duration> for TickInterval {
    type Error = CounterError;

    fn try_from(duration: Duration) -> CounterResult<Self> {
        Self::from_duration(duration)
    }
}

impl fmt::Display for TickInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

/// Monotonic tag identifying which `start()` a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Identifier of a live interval registered with a timer facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}
