//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counts save outcomes per call shape, bytes persisted and cancellations per stage.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label recorded for successful saves.
pub const OUTCOME_SAVED: &str = "saved";

/// Prometheus-backed metrics registry shared by savers.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    saves_total: IntCounterVec,
    bytes_written_total: IntCounter,
    cancellations_total: IntCounterVec,
    saves_succeeded: IntCounter,
    saves_failed: IntCounter,
    cancellations_seen: IntCounter,
}

/// Snapshot of the save counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Saves that completed successfully, across all call shapes.
    pub saves_succeeded: u64,
    /// Saves that ended in a failure, including cancellations.
    pub saves_failed: u64,
    /// Bytes persisted by successful saves.
    pub bytes_written_total: u64,
    /// Cancellations observed, across all stages.
    pub cancellations_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the save collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let saves_total = IntCounterVec::new(
            Opts::new("saves_total", "Save operations by call shape and outcome"),
            &["shape", "outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "saves_total",
            source,
        })?;
        let bytes_written_total = IntCounter::with_opts(Opts::new(
            "bytes_written_total",
            "Payload bytes persisted by successful saves",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "bytes_written_total",
            source,
        })?;
        let cancellations_total = IntCounterVec::new(
            Opts::new("cancellations_total", "Cancelled saves by stage"),
            &["stage"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "cancellations_total",
            source,
        })?;

        register(&registry, "saves_total", Box::new(saves_total.clone()))?;
        register(
            &registry,
            "bytes_written_total",
            Box::new(bytes_written_total.clone()),
        )?;
        register(
            &registry,
            "cancellations_total",
            Box::new(cancellations_total.clone()),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                saves_total,
                bytes_written_total,
                cancellations_total,
                saves_succeeded: tally("saves_succeeded")?,
                saves_failed: tally("saves_failed")?,
                cancellations_seen: tally("cancellations_seen")?,
            }),
        })
    }

    /// Count a finished save. `outcome` is [`OUTCOME_SAVED`] or a failure kind label.
    pub fn inc_save(&self, shape: &str, outcome: &str) {
        self.inner
            .saves_total
            .with_label_values(&[shape, outcome])
            .inc();
        if outcome == OUTCOME_SAVED {
            self.inner.saves_succeeded.inc();
        } else {
            self.inner.saves_failed.inc();
        }
    }

    /// Add persisted bytes.
    pub fn add_bytes_written(&self, bytes: u64) {
        self.inner.bytes_written_total.inc_by(bytes);
    }

    /// Count a cancellation observed at `stage`.
    pub fn inc_cancellation(&self, stage: &str) {
        self.inner
            .cancellations_total
            .with_label_values(&[stage])
            .inc();
        self.inner.cancellations_seen.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the save counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            saves_succeeded: self.inner.saves_succeeded.get(),
            saves_failed: self.inner.saves_failed.get(),
            bytes_written_total: self.inner.bytes_written_total.get(),
            cancellations_total: self.inner.cancellations_seen.get(),
        }
    }
}

/// Unregistered counter backing the snapshot totals.
fn tally(name: &'static str) -> Result<IntCounter> {
    IntCounter::new(name, name)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register(
    registry: &Registry,
    name: &'static str,
    collector: Box<dyn prometheus::core::Collector>,
) -> Result<()> {
    registry
        .register(collector)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
