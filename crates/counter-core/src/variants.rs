//! The four counter variants of the interval demo page.
//!
//! Two of them are baselines kept to reproduce the classic interval bugs:
//!
//! - [`StaleCaptureCounter`] schedules once and increments a value captured at
//!   schedule time. It reports 1 forever.
//! - [`ResubscribingCounter`] also increments a captured value, but tears down
//!   and recreates its timer after every change so the capture stays fresh.
//!   Values are correct; one timer handle is allocated per tick.
//!
//! The other two are [`PeriodicCounter`] with each [`UpdateStrategy`].

use crate::counter::PeriodicCounter;
use crate::observers::{Observer, ObserverRegistry, Subscription};
use crate::timer::{TimerFacility, TimerHandle};
use counter_common::config::{CounterConfig, UpdateStrategy, VariantKind};
use counter_common::error::{CounterError, CounterResult};
use counter_common::metrics::{MetricsSnapshot, TickMetrics};
use counter_common::time::TickInterval;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, trace, warn};

/// Common surface the display layer mounts.
pub trait CounterVariant: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> VariantKind;

    /// Heading shown next to the value.
    fn label(&self) -> &'static str {
        self.kind().label()
    }

    /// Current value.
    fn value(&self) -> i64;

    /// Begin ticking.
    fn start(&self) -> CounterResult<()>;

    /// Stop ticking. No-op when idle.
    fn stop(&self);

    /// Register an observer for every new value.
    fn observe(&self, observer: Observer) -> Subscription;

    /// Resource and delivery counters.
    fn metrics(&self) -> MetricsSnapshot;
}

impl CounterVariant for PeriodicCounter {
    fn kind(&self) -> VariantKind {
        match self.strategy() {
            UpdateStrategy::SelfReferential => VariantKind::StableSetter,
            UpdateStrategy::ShadowCell => VariantKind::LatestRef,
        }
    }

    fn value(&self) -> i64 {
        PeriodicCounter::value(self)
    }

    fn start(&self) -> CounterResult<()> {
        PeriodicCounter::start(self)
    }

    fn stop(&self) {
        PeriodicCounter::stop(self);
    }

    fn observe(&self, observer: Observer) -> Subscription {
        self.subscribe_shared(observer)
    }

    fn metrics(&self) -> MetricsSnapshot {
        PeriodicCounter::metrics(self).snapshot()
    }
}

/// State shared by both baselines and their tick callbacks.
struct Baseline {
    value: AtomicI64,
    timer: Mutex<Option<TimerHandle>>,
    observers: Arc<ObserverRegistry>,
    metrics: TickMetrics,
    facility: Arc<dyn TimerFacility>,
    interval: TickInterval,
}

impl Baseline {
    fn new(interval: TickInterval, facility: Arc<dyn TimerFacility>) -> Arc<Self> {
        Arc::new(Self {
            value: AtomicI64::new(0),
            timer: Mutex::new(None),
            observers: Arc::new(ObserverRegistry::new()),
            metrics: TickMetrics::new(),
            facility,
            interval,
        })
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<TimerHandle>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn value(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    fn notify(&self, value: i64) {
        for observer in self.observers.snapshot() {
            observer(value);
            self.metrics.record_notification();
        }
    }

    /// Install the first timer, capturing the value as it is right now.
    fn start_with<F>(self: &Arc<Self>, schedule: F) -> CounterResult<()>
    where
        F: FnOnce(&Arc<Self>, i64) -> CounterResult<TimerHandle>,
    {
        let mut slot = self.lock_timer();
        if slot.is_some() {
            return Err(CounterError::AlreadyStarted);
        }
        *slot = Some(schedule(self, self.value())?);
        Ok(())
    }

    fn stop(&self) {
        let handle = self.lock_timer().take();
        if let Some(handle) = handle {
            handle.cancel();
            self.metrics.record_timer_released();
        }
    }
}

/// Increments a value captured when its only timer was scheduled.
///
/// Every tick computes `captured + 1` with the same `captured`, so the value
/// is stuck at 1 (or at `n + 1` after a restart at `n`).
pub struct StaleCaptureCounter {
    inner: Arc<Baseline>,
}

impl StaleCaptureCounter {
    /// Create an idle stale-capture counter.
    #[must_use]
    pub fn new(interval: TickInterval, facility: Arc<dyn TimerFacility>) -> Self {
        Self {
            inner: Baseline::new(interval, facility),
        }
    }

    fn schedule(inner: &Arc<Baseline>, captured: i64) -> CounterResult<TimerHandle> {
        let weak = Arc::downgrade(inner);
        let handle = TimerHandle::schedule(
            &inner.facility,
            inner.interval.as_duration(),
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let next = captured + 1;
                    inner.value.store(next, Ordering::Release);
                    inner.metrics.record_tick();
                    trace!(captured, value = next, "Stale tick");
                    inner.notify(next);
                }
            }),
        )?;
        inner.metrics.record_timer_created();
        Ok(handle)
    }
}

impl CounterVariant for StaleCaptureCounter {
    fn kind(&self) -> VariantKind {
        VariantKind::StaleCapture
    }

    fn value(&self) -> i64 {
        self.inner.value()
    }

    fn start(&self) -> CounterResult<()> {
        self.inner.start_with(Self::schedule)
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn observe(&self, observer: Observer) -> Subscription {
        self.inner.observers.subscribe(observer)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Drop for StaleCaptureCounter {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

/// Recreates its timer after every change so the captured value stays fresh.
pub struct ResubscribingCounter {
    inner: Arc<Baseline>,
}

impl ResubscribingCounter {
    /// Create an idle resubscribing counter.
    #[must_use]
    pub fn new(interval: TickInterval, facility: Arc<dyn TimerFacility>) -> Self {
        Self {
            inner: Baseline::new(interval, facility),
        }
    }

    fn schedule(inner: &Arc<Baseline>, captured: i64) -> CounterResult<TimerHandle> {
        let weak = Arc::downgrade(inner);
        let handle = TimerHandle::schedule(
            &inner.facility,
            inner.interval.as_duration(),
            Arc::new(move || Self::on_tick(&weak, captured)),
        )?;
        inner.metrics.record_timer_created();
        debug!(timer = %handle.id(), captured, "Timer recreated");
        Ok(handle)
    }

    fn on_tick(weak: &Weak<Baseline>, captured: i64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };

        let next = captured + 1;
        let previous = {
            let mut slot = inner.lock_timer();
            // Stopped while this tick was in flight.
            if slot.is_none() {
                return;
            }
            inner.value.store(next, Ordering::Release);
            inner.metrics.record_tick();

            let previous = slot.take();
            match Self::schedule(&inner, next) {
                Ok(handle) => *slot = Some(handle),
                Err(e) => warn!("Failed to recreate timer: {e}"),
            }
            previous
        };

        if let Some(previous) = previous {
            previous.cancel();
            inner.metrics.record_timer_released();
        }
        inner.notify(next);
    }
}

impl CounterVariant for ResubscribingCounter {
    fn kind(&self) -> VariantKind {
        VariantKind::Resubscribing
    }

    fn value(&self) -> i64 {
        self.inner.value()
    }

    fn start(&self) -> CounterResult<()> {
        self.inner.start_with(Self::schedule)
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn observe(&self, observer: Observer) -> Subscription {
        self.inner.observers.subscribe(observer)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Drop for ResubscribingCounter {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

/// Construct any of the four variants, idle.
///
/// The two [`PeriodicCounter`] variants take their start and restart policies
/// from `config`. Each variant keeps its own update strategy regardless of
/// `config.strategy`.
///
/// # Errors
///
/// Returns [`CounterError::InvalidInterval`] or [`CounterError::Config`] if
/// `config` fails validation.
pub fn build_variant(
    kind: VariantKind,
    config: &CounterConfig,
    facility: Arc<dyn TimerFacility>,
) -> CounterResult<Box<dyn CounterVariant>> {
    let interval = config.tick_interval()?;
    Ok(match kind {
        VariantKind::StaleCapture => Box::new(StaleCaptureCounter::new(interval, facility)),
        VariantKind::Resubscribing => Box::new(ResubscribingCounter::new(interval, facility)),
        VariantKind::StableSetter => Box::new(
            PeriodicCounter::from_config(config, facility)?
                .with_strategy(UpdateStrategy::SelfReferential),
        ),
        VariantKind::LatestRef => Box::new(
            PeriodicCounter::from_config(config, facility)?
                .with_strategy(UpdateStrategy::ShadowCell),
        ),
    })
}
