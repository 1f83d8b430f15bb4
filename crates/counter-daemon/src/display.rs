//! Display layer: mounts counter variants and renders them as text.
//!
//! Each row subscribes once on mount and keeps the last delivered value.
//! Unmounting releases every subscription and stops every counter.

use counter_common::config::VariantKind;
use counter_common::error::CounterResult;
use counter_common::metrics::MetricsSnapshot;
use counter_core::{CounterVariant, Subscription};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

const TITLE: &str = "setInterval demystified";

struct Row {
    variant: Box<dyn CounterVariant>,
    latest: Arc<AtomicI64>,
    subscription: Subscription,
}

/// The rendered page: one row per mounted variant.
pub struct Page {
    rows: Vec<Row>,
    dirty: Arc<AtomicBool>,
}

/// Final per-variant figures reported on unmount.
#[derive(Debug, Clone, Serialize)]
pub struct VariantReport {
    /// Variant name.
    pub variant: String,
    /// Last value rendered.
    pub value: i64,
    /// Timer and delivery counters.
    pub metrics: MetricsSnapshot,
}

impl Page {
    /// Subscribe to every variant. Rows render in the given order.
    pub fn mount(variants: Vec<Box<dyn CounterVariant>>) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let rows = variants
            .into_iter()
            .map(|variant| {
                let latest = Arc::new(AtomicI64::new(variant.value()));
                let sink = Arc::clone(&latest);
                let flag = Arc::clone(&dirty);
                let subscription = variant.observe(Arc::new(move |value| {
                    sink.store(value, Ordering::Release);
                    flag.store(true, Ordering::Release);
                }));
                debug!(variant = %variant.kind(), "Mounted");
                Row {
                    variant,
                    latest,
                    subscription,
                }
            })
            .collect();

        Self { rows, dirty }
    }

    /// Start every mounted counter.
    pub fn start_all(&self) -> CounterResult<()> {
        for row in &self.rows {
            row.variant.start()?;
        }
        Ok(())
    }

    /// Kinds in render order.
    pub fn kinds(&self) -> Vec<VariantKind> {
        self.rows.iter().map(|row| row.variant.kind()).collect()
    }

    /// Last value delivered to each row.
    pub fn values(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|row| row.latest.load(Ordering::Acquire))
            .collect()
    }

    /// Render if anything changed since the previous call.
    pub fn render_if_changed(&self) -> Option<String> {
        self.dirty
            .swap(false, Ordering::AcqRel)
            .then(|| self.render())
    }

    /// Render every row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{TITLE}");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "  {}: {}",
                row.variant.label(),
                row.latest.load(Ordering::Acquire)
            );
        }
        out
    }

    /// Release subscriptions, stop counters, and report final figures.
    pub fn unmount(self) -> Vec<VariantReport> {
        self.rows
            .into_iter()
            .map(|row| {
                row.subscription.unsubscribe();
                row.variant.stop();
                debug!(variant = %row.variant.kind(), "Unmounted");
                VariantReport {
                    variant: row.variant.kind().to_string(),
                    value: row.latest.load(Ordering::Acquire),
                    metrics: row.variant.metrics(),
                }
            })
            .collect()
    }
}
