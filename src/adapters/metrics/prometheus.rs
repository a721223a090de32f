//! Exporter Self-Metrics - Probe and Backend Observability
//!
//! Registers the exporter's own Prometheus metrics, served on
//! `/metrics`. Rule gauges produced by probes live in the dynamic
//! registry instead and are only exposed on `/probe`.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Centralized Prometheus metrics for the exporter itself.
///
/// All metrics follow the naming convention `rules_exporter_*`.
pub struct ExporterMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Probes served, by target.
    pub probes_total: IntCounterVec,
    /// Probe wall time, by target.
    pub probe_duration_seconds: HistogramVec,
    /// Backend round trips, by outcome (`success` / `error`).
    pub backend_queries_total: IntCounterVec,
    /// Failed rule evaluations, by target and rule.
    pub query_errors_total: IntCounterVec,
    /// Result rows dropped for an unparseable value, by target and rule.
    pub rows_skipped_total: IntCounterVec,
    /// Observations rejected for a changed label schema, by target and rule.
    pub schema_mismatches_total: IntCounterVec,
    /// Evaluations answered from the result cache.
    pub cache_hits_total: IntCounter,
    /// Evaluations that had to query the backend.
    pub cache_misses_total: IntCounter,
    /// Entries currently held by the result cache.
    pub cache_entries: IntGauge,
}

impl ExporterMetrics {
    /// Create and register all exporter metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let probes_total = IntCounterVec::new(
            Opts::new("rules_exporter_probes_total", "Total probe requests served"),
            &["target"],
        )?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "rules_exporter_probe_duration_seconds",
                "Time spent evaluating all rules of a target",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["target"],
        )?;

        let backend_queries_total = IntCounterVec::new(
            Opts::new(
                "rules_exporter_backend_queries_total",
                "Total queries sent to backends",
            ),
            &["outcome"],
        )?;

        let query_errors_total = IntCounterVec::new(
            Opts::new(
                "rules_exporter_query_errors_total",
                "Rule evaluations that failed and were skipped",
            ),
            &["target", "rule"],
        )?;

        let rows_skipped_total = IntCounterVec::new(
            Opts::new(
                "rules_exporter_rows_skipped_total",
                "Result rows dropped because their value was not a number",
            ),
            &["target", "rule"],
        )?;

        let schema_mismatches_total = IntCounterVec::new(
            Opts::new(
                "rules_exporter_schema_mismatches_total",
                "Observations dropped because their label names changed",
            ),
            &["target", "rule"],
        )?;

        let cache_hits_total = IntCounter::new(
            "rules_exporter_cache_hits_total",
            "Rule evaluations served from the result cache",
        )?;

        let cache_misses_total = IntCounter::new(
            "rules_exporter_cache_misses_total",
            "Rule evaluations that missed the result cache",
        )?;

        let cache_entries = IntGauge::new(
            "rules_exporter_cache_entries",
            "Entries held by the result cache",
        )?;

        // Register all metrics
        registry.register(Box::new(probes_total.clone()))?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;
        registry.register(Box::new(backend_queries_total.clone()))?;
        registry.register(Box::new(query_errors_total.clone()))?;
        registry.register(Box::new(rows_skipped_total.clone()))?;
        registry.register(Box::new(schema_mismatches_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;

        Ok(Self {
            registry,
            probes_total,
            probe_duration_seconds,
            backend_queries_total,
            query_errors_total,
            rows_skipped_total,
            schema_mismatches_total,
            cache_hits_total,
            cache_misses_total,
            cache_entries,
        })
    }

    /// Encode all exporter metrics in the text exposition format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}
