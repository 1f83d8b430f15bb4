use thiserror::Error;

/// Counter error types covering lifecycle misuse, validation, and timer failures.
///
/// Ticks discarded after `stop()` are deliberately absent here: they are an
/// internal outcome counted by [`crate::TickMetrics`], never a caller error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// `start()` was called while a timer is already live.
    #[error("counter already started")]
    AlreadyStarted,

    /// Tick interval is zero, negative, or below millisecond resolution.
    #[error("invalid tick interval: {0}")]
    InvalidInterval(String),

    /// Invalid lifecycle transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Configuration value rejected.
    #[error("configuration error: {0}")]
    Config(String),

    /// The timer facility could not schedule a wake-up.
    #[error("timer error: {0}")]
    Timer(String),
}

/// Convenience type alias for counter operations.
pub type CounterResult<T> = Result<T, CounterError>;
