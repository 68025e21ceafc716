//! Prometheus Metrics Registry - Sampling Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers sampling throughput, recording failures, purge volume and
//! cache size.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::usecases::sampler::{SampleReport, SnapshotReport};

/// Centralized Prometheus metrics for the balance tracker.
///
/// All metrics follow the naming convention `balance_tracker_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Identities processed by the sampler.
    pub identities_checked: IntCounter,
    /// History rows written, by `kind` (new, changed, snapshot).
    pub changes_recorded: IntCounterVec,
    /// Per-identity sampling failures.
    pub sample_failures: IntCounter,
    /// History rows deleted by retention.
    pub rows_purged: IntCounter,
    /// Identities held in the cache.
    pub cache_size: IntGauge,
    /// Duration of the last sampling run (seconds).
    pub last_sample_seconds: Gauge,
    /// Sampling run duration distribution (seconds).
    pub sample_duration: Histogram,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let identities_checked = IntCounter::new(
            "balance_tracker_identities_checked_total",
            "Identities processed by the balance sampler",
        )?;

        let changes_recorded = IntCounterVec::new(
            Opts::new(
                "balance_tracker_changes_recorded_total",
                "History rows written",
            ),
            &["kind"],
        )?;

        let sample_failures = IntCounter::new(
            "balance_tracker_sample_failures_total",
            "Per-identity fetch or record failures",
        )?;

        let rows_purged = IntCounter::new(
            "balance_tracker_rows_purged_total",
            "History rows deleted by retention",
        )?;

        let cache_size = IntGauge::new(
            "balance_tracker_cache_size",
            "Identities held in the last-known cache",
        )?;

        let last_sample_seconds = Gauge::new(
            "balance_tracker_last_sample_seconds",
            "Duration of the last sampling run in seconds",
        )?;

        let sample_duration = Histogram::with_opts(
            HistogramOpts::new(
                "balance_tracker_sample_duration_seconds",
                "Sampling run duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(identities_checked.clone()))?;
        registry.register(Box::new(changes_recorded.clone()))?;
        registry.register(Box::new(sample_failures.clone()))?;
        registry.register(Box::new(rows_purged.clone()))?;
        registry.register(Box::new(cache_size.clone()))?;
        registry.register(Box::new(last_sample_seconds.clone()))?;
        registry.register(Box::new(sample_duration.clone()))?;

        Ok(Self {
            registry,
            identities_checked,
            changes_recorded,
            sample_failures,
            rows_purged,
            cache_size,
            last_sample_seconds,
            sample_duration,
        })
    }

    /// Fold a sampling run into the counters.
    pub fn observe_sample(&self, report: &SampleReport) {
        self.identities_checked.inc_by(report.checked as u64);
        self.changes_recorded
            .with_label_values(&["new"])
            .inc_by(report.new as u64);
        self.changes_recorded
            .with_label_values(&["changed"])
            .inc_by(report.changed as u64);
        self.sample_failures.inc_by(report.failed as u64);

        let seconds = report.duration_ms as f64 / 1_000.0;
        self.last_sample_seconds.set(seconds);
        self.sample_duration.observe(seconds);
    }

    /// Fold a top-N snapshot into the counters.
    pub fn observe_snapshot(&self, report: &SnapshotReport) {
        self.changes_recorded
            .with_label_values(&["snapshot"])
            .inc_by(report.recorded as u64);
        self.sample_failures.inc_by(report.failed as u64);
    }

    /// Record rows deleted by a purge.
    pub fn observe_purge(&self, deleted: u64) {
        self.rows_purged.inc_by(deleted);
    }

    /// Update the cache size gauge.
    pub fn set_cache_size(&self, size: usize) {
        self.cache_size.set(i64::try_from(size).unwrap_or(i64::MAX));
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_sample_updates_counters() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.observe_sample(&SampleReport {
            checked: 5,
            new: 1,
            changed: 2,
            skipped: 1,
            failed: 1,
            duration_ms: 250,
        });

        assert_eq!(metrics.identities_checked.get(), 5);
        assert_eq!(metrics.changes_recorded.with_label_values(&["changed"]).get(), 2);
        assert_eq!(metrics.sample_failures.get(), 1);
        assert!((metrics.last_sample_seconds.get() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_render_contains_metric_names() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.observe_purge(3);
        metrics.set_cache_size(7);
        let text = metrics.render();
        assert!(text.contains("balance_tracker_rows_purged_total 3"));
        assert!(text.contains("balance_tracker_cache_size 7"));
    }
}
