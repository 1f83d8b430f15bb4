//! Thread-backed timer facility.
//!
//! Each interval runs on its own named thread. Deadlines are absolute
//! (`next = next + period`) so callback execution time does not accumulate
//! drift. Waiting uses a [`Parker`], letting `clear_interval` wake the thread
//! immediately instead of waiting out the current period.

use crate::timer::{TickCallback, TimerFacility};
use counter_common::error::{CounterError, CounterResult};
use counter_common::time::TimerId;
use crossbeam_utils::sync::{Parker, Unparker};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct IntervalThread {
    stop_requested: Arc<AtomicBool>,
    unparker: Unparker,
    handle: JoinHandle<()>,
}

impl IntervalThread {
    /// Signal the thread and wait for it, unless we are that thread.
    fn shutdown(self) {
        self.stop_requested.store(true, Ordering::Release);
        self.unparker.unpark();

        if self.handle.thread().id() == thread::current().id() {
            // Cleared from inside its own callback; the loop exits once the
            // callback returns.
            return;
        }
        if self.handle.join().is_err() {
            warn!("Timer thread panicked");
        }
    }
}

/// Timer facility using one OS thread per interval.
#[derive(Default)]
pub struct ThreadTimer {
    next_id: AtomicU64,
    threads: Mutex<HashMap<TimerId, IntervalThread>>,
}

impl ThreadTimer {
    /// Create a facility with no intervals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TimerId, IntervalThread>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerFacility for ThreadTimer {
    fn set_interval(&self, period: Duration, callback: TickCallback) -> CounterResult<TimerId> {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let stop_requested = Arc::new(AtomicBool::new(false));
        let parker = Parker::new();
        let unparker = parker.unparker().clone();

        let stop = Arc::clone(&stop_requested);
        let handle = thread::Builder::new()
            .name(format!("counter-timer-{}", id.0))
            .spawn(move || {
                debug!(timer = %id, period_ms = period.as_millis(), "Timer thread started");
                let mut deadline = Instant::now() + period;

                loop {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    let now = Instant::now();
                    if now < deadline {
                        parker.park_timeout(deadline - now);
                        continue;
                    }

                    callback();
                    deadline += period;
                }

                debug!(timer = %id, "Timer thread stopped");
            })
            .map_err(|e| CounterError::Timer(format!("failed to spawn timer thread: {e}")))?;

        self.lock().insert(
            id,
            IntervalThread {
                stop_requested,
                unparker,
                handle,
            },
        );
        Ok(id)
    }

    fn clear_interval(&self, id: TimerId) {
        // Release the map lock before joining.
        let entry = self.lock().remove(&id);
        if let Some(entry) = entry {
            entry.shutdown();
        }
    }

    fn active_timers(&self) -> usize {
        self.lock().len()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        let threads: Vec<_> = self.lock().drain().map(|(_, t)| t).collect();
        for thread in threads {
            thread.shutdown();
        }
    }
}
