//! Prober - Scrape Orchestration for One Target
//!
//! Resolves a target, evaluates its rules in declared order, feeds the
//! resulting tuples into the shared registry, and returns a snapshot of
//! the target's metrics for exposition.
//!
//! Failure containment:
//! - A failed query skips its rule; later rules still run
//! - A schema mismatch drops that one observation
//! - Observations from rules that already completed are kept even if
//!   the request is abandoned mid-scrape

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::adapters::metrics::ExporterMetrics;
use crate::domain::error::ProbeError;
use crate::domain::{Catalog, MetricRegistry, MetricSnapshot, Target};
use crate::ports::QueryBackend;
use crate::usecases::evaluator::QueryEvaluator;

/// Per-probe counters, returned alongside the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
  /// Rules whose query succeeded.
  pub rules_ok: usize,
  /// Successful rules answered from the result cache.
  pub rules_cached: usize,
  /// Rules skipped because their query failed.
  pub rules_failed: usize,
  /// Tuples written into the registry.
  pub observed: usize,
  /// Rows dropped for an unparseable value.
  pub rows_skipped: usize,
  /// Tuples dropped for a label schema mismatch.
  pub schema_mismatches: usize,
}

/// Result of one probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
  /// The target's metrics, in rule order.
  pub snapshot: Vec<MetricSnapshot>,
  /// What happened during evaluation.
  pub stats: ProbeStats,
}

/// Runs probes against the catalog with a shared registry.
pub struct Prober<B: QueryBackend> {
  /// Target catalog.
  catalog: Arc<Catalog>,
  /// Query evaluator.
  evaluator: QueryEvaluator<B>,
  /// Process-wide rule gauges.
  registry: Arc<MetricRegistry>,
  /// Self-metrics.
  metrics: Arc<ExporterMetrics>,
}

impl<B: QueryBackend> Prober<B> {
  /// Create a new prober.
  pub fn new(
    catalog: Arc<Catalog>,
    evaluator: QueryEvaluator<B>,
    registry: Arc<MetricRegistry>,
    metrics: Arc<ExporterMetrics>,
  ) -> Self {
    Self {
      catalog,
      evaluator,
      registry,
      metrics,
    }
  }

  /// The shared registry.
  pub fn registry(&self) -> &Arc<MetricRegistry> {
    &self.registry
  }

  /// Probe `target`: evaluate every rule and snapshot the results.
  ///
  /// Only an unknown target is an error. Per-rule failures are logged
  /// and reflected in the returned stats.
  #[instrument(skip(self))]
  pub async fn probe(&self, target: &str) -> Result<ProbeOutcome, ProbeError> {
    let target = self.catalog.resolve(target)?;
    let started = Instant::now();

    let stats = self.evaluate_rules(&target).await;

    self.metrics.probes_total.with_label_values(&[target.name.as_str()]).inc();
    self
      .metrics
      .probe_duration_seconds
      .with_label_values(&[target.name.as_str()])
      .observe(started.elapsed().as_secs_f64());

    debug!(
      target = %target.name,
      rules_ok = stats.rules_ok,
      rules_cached = stats.rules_cached,
      rules_failed = stats.rules_failed,
      observed = stats.observed,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "Probe completed"
    );

    let snapshot = self
      .registry
      .snapshot_of(target.rules.iter().map(|r| r.name.as_str()));

    Ok(ProbeOutcome { snapshot, stats })
  }

  async fn evaluate_rules(&self, target: &Target) -> ProbeStats {
    let mut stats = ProbeStats::default();

    for rule in &target.rules {
      let evaluation = match self.evaluator.evaluate(&target.endpoint, &rule.expression).await {
        Ok(evaluation) => evaluation,
        Err(e) => {
          warn!(
            target = %target.name,
            rule = %rule.name,
            error = %e,
            "Error querying backend for rule"
          );
          self
            .metrics
            .query_errors_total
            .with_label_values(&[target.name.as_str(), rule.name.as_str()])
            .inc();
          stats.rules_failed += 1;
          continue;
        }
      };

      stats.rules_ok += 1;
      if evaluation.cached {
        stats.rules_cached += 1;
      } else if evaluation.skipped_rows > 0 {
        stats.rows_skipped += evaluation.skipped_rows;
        self
          .metrics
          .rows_skipped_total
          .with_label_values(&[target.name.as_str(), rule.name.as_str()])
          .inc_by(evaluation.skipped_rows as u64);
      }

      for tuple in &evaluation.tuples {
        match self.registry.observe(rule, tuple) {
          Ok(()) => stats.observed += 1,
          Err(e) => {
            warn!(
              target = %target.name,
              rule = %rule.name,
              expected = ?e.expected,
              found = ?e.found,
              "Dropping observation with mismatched label names"
            );
            self
              .metrics
              .schema_mismatches_total
              .with_label_values(&[target.name.as_str(), rule.name.as_str()])
              .inc();
            stats.schema_mismatches += 1;
          }
        }
      }
    }

    stats
  }
}
