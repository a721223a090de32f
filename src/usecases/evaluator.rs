//! Query Evaluator - One Backend Query per Rule, Memoized
//!
//! Turns a rule expression into label tuples:
//! - Consults the result cache first (keyed by endpoint + expression)
//! - On a miss, issues exactly one backend query and caches the result
//! - Parses each row's string value; rows that fail are skipped and
//!   counted, the rest of the result is kept (partial-result policy)
//!
//! Failed queries are never cached.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::adapters::metrics::ExporterMetrics;
use crate::domain::error::{QueryError, RowParseError};
use crate::domain::{LabelTuple, TtlCache};
use crate::ports::{QueryBackend, RawSample};

/// Cache key: the same expression on two endpoints is two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  /// Backend base URL.
  pub endpoint: String,
  /// Query expression.
  pub expression: String,
}

/// Shared result cache type.
pub type ResultCache = TtlCache<QueryKey, Arc<Vec<LabelTuple>>>;

/// Outcome of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
  /// Parsed rows, in backend order.
  pub tuples: Vec<LabelTuple>,
  /// Rows dropped because their value was not a number.
  pub skipped_rows: usize,
  /// Whether the result came from the cache.
  pub cached: bool,
}

/// Evaluates expressions against a `QueryBackend`, optionally memoized.
pub struct QueryEvaluator<B: QueryBackend> {
  /// Backend port.
  backend: Arc<B>,
  /// Result cache and TTL; `None` disables caching.
  cache: Option<(Arc<ResultCache>, Duration)>,
  /// Self-metrics.
  metrics: Arc<ExporterMetrics>,
}

impl<B: QueryBackend> QueryEvaluator<B> {
  /// Create an evaluator without a cache.
  pub fn new(backend: Arc<B>, metrics: Arc<ExporterMetrics>) -> Self {
    Self {
      backend,
      cache: None,
      metrics,
    }
  }

  /// Memoize successful results in `cache` for `ttl`.
  pub fn with_cache(mut self, cache: Arc<ResultCache>, ttl: Duration) -> Self {
    self.cache = Some((cache, ttl));
    self
  }

  /// Evaluate `expression` on `endpoint`.
  #[instrument(skip(self))]
  pub async fn evaluate(&self, endpoint: &str, expression: &str) -> Result<Evaluation, QueryError> {
    let key = QueryKey {
      endpoint: endpoint.to_string(),
      expression: expression.to_string(),
    };

    if let Some((cache, _)) = &self.cache {
      if let Some(tuples) = cache.get(&key) {
        self.metrics.cache_hits_total.inc();
        debug!(rows = tuples.len(), "Result cache hit");
        return Ok(Evaluation {
          tuples: (*tuples).clone(),
          skipped_rows: 0,
          cached: true,
        });
      }
      self.metrics.cache_misses_total.inc();
    }

    let rows = match self.backend.instant_query(endpoint, expression).await {
      Ok(rows) => {
        self.metrics.backend_queries_total.with_label_values(&["success"]).inc();
        rows
      }
      Err(e) => {
        self.metrics.backend_queries_total.with_label_values(&["error"]).inc();
        return Err(e);
      }
    };

    let mut tuples = Vec::with_capacity(rows.len());
    let mut skipped_rows = 0;
    for row in rows {
      match parse_row(row) {
        Ok(tuple) => tuples.push(tuple),
        Err(e) => {
          debug!(error = %e, "Skipping result row");
          skipped_rows += 1;
        }
      }
    }

    if skipped_rows > 0 {
      warn!(skipped = skipped_rows, kept = tuples.len(), "Dropped rows with unparseable values");
    }

    if let Some((cache, ttl)) = &self.cache {
      cache.set(key, Arc::new(tuples.clone()), *ttl);
      self.metrics.cache_entries.set(cache.len() as i64);
    }

    Ok(Evaluation {
      tuples,
      skipped_rows,
      cached: false,
    })
  }
}

/// Parse one backend row into a tuple.
///
/// Accepts the backend's `NaN`, `+Inf` and `-Inf` spellings. The
/// `__name__` label is dropped: the rule's record name replaces it.
pub fn parse_row(row: RawSample) -> Result<LabelTuple, RowParseError> {
  let value = row
    .value
    .trim()
    .parse::<f64>()
    .map_err(|_| RowParseError { value: row.value.clone() })?;

  let mut labels = row.metric;
  labels.remove("__name__");

  Ok(LabelTuple { labels, value })
}
