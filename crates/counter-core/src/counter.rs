//! Periodic counter with consistent cadence.
//!
//! The counter owns at most one live [`TimerHandle`]. Each tick increments the
//! value by one and notifies every subscribed observer. The tick handler reads
//! the value current at fire time (see [`UpdateStrategy`]), so the timer is
//! created once per `start()` and survives every value change.
//!
//! Ticks are tagged with the [`Generation`] of the `start()` that scheduled
//! them. `stop()` bumps the generation, so a wake-up already in flight at the
//! timer facility is recognised and dropped at delivery time.
//!
//! # Locking
//!
//! - `delivery` serializes tick deliveries: every observer sees tick N before
//!   tick N+1 begins. `stop()` takes it too, so no delivery is running when
//!   `stop()` returns.
//! - `core` guards value, state, and handle. It is never held while an
//!   observer runs or while a timer is cleared.

use crate::observers::{Observer, ObserverRegistry, Subscription};
use crate::timer::{TickCallback, TimerFacility, TimerHandle};
use counter_common::config::{CounterConfig, RestartPolicy, StartPolicy, UpdateStrategy};
use counter_common::error::{CounterError, CounterResult};
use counter_common::metrics::TickMetrics;
use counter_common::state::{CounterState, StateMachine};
use counter_common::time::{Generation, TickInterval};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, info, trace, warn};

/// Result of one wake-up reaching the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The value was incremented to the contained value and observers notified.
    Delivered(i64),
    /// The tick was dropped without touching the value.
    Discarded(DiscardReason),
}

/// Why a tick was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The tick belongs to a superseded generation (arrived after `stop()`).
    LateTickDiscarded {
        /// Generation the tick was scheduled under.
        scheduled: Generation,
        /// Generation current at delivery.
        current: Generation,
    },
}

struct Core {
    machine: StateMachine,
    generation: Generation,
    value: i64,
    handle: Option<TimerHandle>,
    strategy: UpdateStrategy,
}

struct Shared {
    core: Mutex<Core>,
    /// Always-current copy of `value`, written by every writer under `core`.
    shadow: AtomicI64,
    /// Mirror of `Core::generation`, readable without `core`.
    live_generation: AtomicU64,
    delivery: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
    observers: Arc<ObserverRegistry>,
    metrics: Arc<TickMetrics>,
}

/// Held for the duration of one tick delivery.
struct DeliveryGuard<'a> {
    shared: &'a Shared,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.shared.delivering_on) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        lock(&self.core)
    }

    /// Store a new value, keeping the shadow cell in step.
    fn write_value(&self, core: &mut Core, value: i64) {
        core.value = value;
        self.shadow.store(value, Ordering::Release);
    }

    fn set_generation(&self, core: &mut Core, generation: Generation) {
        core.generation = generation;
        self.live_generation.store(generation.0, Ordering::Release);
    }

    fn enter_delivery(&self) -> DeliveryGuard<'_> {
        let guard = lock(&self.delivery);
        *lock(&self.delivering_on) = Some(thread::current().id());
        DeliveryGuard {
            shared: self,
            _lock: guard,
        }
    }

    /// True when called from an observer during a delivery on this thread.
    fn delivering_on_current_thread(&self) -> bool {
        *lock(&self.delivering_on) == Some(thread::current().id())
    }

    /// Handle one wake-up scheduled under `scheduled`.
    fn on_tick(&self, scheduled: Generation) -> TickOutcome {
        let _delivery = self.enter_delivery();

        let value = {
            let mut core = self.lock_core();
            if core.generation != scheduled || !core.machine.state().is_running() {
                let current = core.generation;
                drop(core);
                self.metrics.record_late_tick();
                debug!(
                    scheduled = scheduled.0,
                    current = current.0,
                    "Late tick discarded"
                );
                return TickOutcome::Discarded(DiscardReason::LateTickDiscarded {
                    scheduled,
                    current,
                });
            }

            let next = match core.strategy {
                UpdateStrategy::SelfReferential => increment(core.value),
                UpdateStrategy::ShadowCell => increment(self.shadow.load(Ordering::Acquire)),
            };
            self.write_value(&mut core, next);
            next
        };

        self.metrics.record_tick();
        trace!(value, generation = scheduled.0, "Tick");

        for observer in self.observers.snapshot() {
            // An observer may have stopped the counter mid-delivery.
            if self.live_generation.load(Ordering::Acquire) != scheduled.0 {
                break;
            }
            observer(value);
            self.metrics.record_notification();
        }

        TickOutcome::Delivered(value)
    }
}

fn increment(current: i64) -> i64 {
    current.saturating_add(1)
}

fn tick_callback(shared: Weak<Shared>, generation: Generation) -> TickCallback {
    Arc::new(move || {
        if let Some(shared) = shared.upgrade() {
            shared.on_tick(generation);
        }
    })
}

/// A counter incremented by one on every tick of its own timer.
///
/// Lifecycle is `IDLE → start() → RUNNING → stop() → IDLE`; dropping the
/// counter stops it.
pub struct PeriodicCounter {
    shared: Arc<Shared>,
    facility: Arc<dyn TimerFacility>,
    interval: TickInterval,
    start_policy: StartPolicy,
    restart_policy: RestartPolicy,
}

impl PeriodicCounter {
    /// Create an idle counter ticking every `interval_ms` milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::InvalidInterval`] for zero or negative values.
    pub fn new(interval_ms: i64, facility: Arc<dyn TimerFacility>) -> CounterResult<Self> {
        Ok(Self::with_interval(
            TickInterval::from_millis(interval_ms)?,
            facility,
        ))
    }

    /// Create an idle counter from an already validated interval.
    #[must_use]
    pub fn with_interval(interval: TickInterval, facility: Arc<dyn TimerFacility>) -> Self {
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    machine: StateMachine::new(),
                    generation: Generation::default(),
                    value: 0,
                    handle: None,
                    strategy: UpdateStrategy::default(),
                }),
                shadow: AtomicI64::new(0),
                live_generation: AtomicU64::new(0),
                delivery: Mutex::new(()),
                delivering_on: Mutex::new(None),
                observers: Arc::new(ObserverRegistry::new()),
                metrics: Arc::new(TickMetrics::new()),
            }),
            facility,
            interval,
            start_policy: StartPolicy::default(),
            restart_policy: RestartPolicy::default(),
        }
    }

    /// Create an idle counter with every option taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::InvalidInterval`] for an unusable interval and
    /// [`CounterError::Config`] if any other setting fails validation.
    pub fn from_config(
        config: &CounterConfig,
        facility: Arc<dyn TimerFacility>,
    ) -> CounterResult<Self> {
        let interval = config.tick_interval()?;
        config.validate()?;
        Ok(Self::with_interval(interval, facility)
            .with_strategy(config.strategy)
            .with_start_policy(config.start_policy)
            .with_restart_policy(config.restart_policy))
    }

    /// Choose how ticks read the current value.
    ///
    /// Applies from the next tick, also on a running counter.
    #[must_use]
    pub fn with_strategy(self, strategy: UpdateStrategy) -> Self {
        self.shared.lock_core().strategy = strategy;
        self
    }

    /// Choose what `start()` does while running.
    #[must_use]
    pub fn with_start_policy(mut self, policy: StartPolicy) -> Self {
        self.start_policy = policy;
        self
    }

    /// Choose whether `start()` resumes or zeroes the value.
    #[must_use]
    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Begin ticking at the configured interval.
    ///
    /// Creates exactly one timer handle. While already running, the
    /// [`StartPolicy`] decides: `Reject` fails with
    /// [`CounterError::AlreadyStarted`], `Ignore` returns `Ok(())` and keeps
    /// the live timer.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::AlreadyStarted`] under `Reject` while running,
    /// or [`CounterError::Timer`] if the facility cannot schedule the interval.
    pub fn start(&self) -> CounterResult<()> {
        let mut core = self.shared.lock_core();

        if core.machine.state().is_running() {
            return match self.start_policy {
                StartPolicy::Reject => Err(CounterError::AlreadyStarted),
                StartPolicy::Ignore => {
                    warn!("start() on running counter ignored");
                    Ok(())
                }
            };
        }
        debug_assert!(core.handle.is_none(), "idle counter holds a live timer");

        let generation = core.generation.next();
        let handle = TimerHandle::schedule(
            &self.facility,
            self.interval.as_duration(),
            tick_callback(Arc::downgrade(&self.shared), generation),
        )?;
        self.shared.metrics.record_timer_created();
        debug!(timer = %handle.id(), generation = generation.0, "Timer created");

        core.machine.transition(CounterState::Running)?;
        self.shared.set_generation(&mut core, generation);
        if self.restart_policy == RestartPolicy::Reset {
            self.shared.write_value(&mut core, 0);
        }
        core.handle = Some(handle);

        info!(
            interval = %self.interval,
            strategy = %core.strategy,
            value = core.value,
            "Counter started"
        );
        Ok(())
    }

    /// Cancel the live timer. No-op when idle.
    ///
    /// Once this returns no observer is notified again for the current run,
    /// including for ticks already in flight at the timer facility.
    pub fn stop(&self) {
        let delivery = if self.shared.delivering_on_current_thread() {
            None
        } else {
            Some(lock(&self.shared.delivery))
        };

        let handle = {
            let mut core = self.shared.lock_core();
            if !core.machine.state().is_running() {
                return;
            }
            let generation = core.generation.next();
            self.shared.set_generation(&mut core, generation);
            if let Err(e) = core.machine.transition(CounterState::Idle) {
                warn!("Counter stop transition failed: {e}");
            }
            info!(value = core.value, "Counter stopped");
            core.handle.take()
        };
        drop(delivery);

        if let Some(handle) = handle {
            debug!(timer = %handle.id(), "Timer released");
            handle.cancel();
            self.shared.metrics.record_timer_released();
        }
    }

    /// Register an observer called with the new value after every increment.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.shared.observers.subscribe(Arc::new(observer))
    }

    /// Register an already shared observer.
    pub fn subscribe_shared(&self, observer: Observer) -> Subscription {
        self.shared.observers.subscribe(observer)
    }

    /// Zero the value. The next tick yields 1 under either strategy.
    pub fn reset(&self) {
        let mut core = self.shared.lock_core();
        self.shared.write_value(&mut core, 0);
        debug!("Counter reset");
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.shared.lock_core().value
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CounterState {
        self.shared.lock_core().machine.state()
    }

    /// Current generation tag.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.shared.lock_core().generation
    }

    /// Configured tick interval.
    #[must_use]
    pub fn interval(&self) -> TickInterval {
        self.interval
    }

    /// Configured update strategy.
    #[must_use]
    pub fn strategy(&self) -> UpdateStrategy {
        self.shared.lock_core().strategy
    }

    /// Number of current observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.observers.len()
    }

    /// Resource and delivery counters.
    #[must_use]
    pub fn metrics(&self) -> &TickMetrics {
        &self.shared.metrics
    }
}

impl Drop for PeriodicCounter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for PeriodicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.lock_core();
        f.debug_struct("PeriodicCounter")
            .field("interval", &self.interval)
            .field("strategy", &core.strategy)
            .field("state", &core.machine.state())
            .field("value", &core.value)
            .field("generation", &core.generation)
            .finish_non_exhaustive()
    }
}
