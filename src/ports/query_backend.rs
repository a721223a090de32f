//! Query Backend Port - Instant Query Interface
//!
//! The narrow interface the evaluator needs from a time-series
//! backend: run one instant query against an endpoint and return the
//! decoded result rows. Values stay string-encoded here; turning them
//! into numbers is the evaluator's job so that a bad row can be skipped
//! without failing the whole query.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::error::QueryError;

/// One decoded result row, value not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
  /// Series labels as returned by the backend.
  pub metric: BTreeMap<String, String>,
  /// String-encoded sample value, e.g. `"12.5"` or `"NaN"`. Empty when
  /// the row had no scalar value, such as a native histogram.
  pub value: String,
}

impl RawSample {
  /// Build a row from label pairs and a raw value.
  pub fn new<K, V>(metric: impl IntoIterator<Item = (K, V)>, value: impl Into<String>) -> Self
  where
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      metric: metric
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
      value: value.into(),
    }
  }
}

/// A backend that can evaluate instant queries.
///
/// Implementations issue exactly one request per call and must bound
/// it with a timeout.
#[async_trait]
pub trait QueryBackend: Send + Sync + 'static {
  /// Evaluate `expression` at the current time on `endpoint`.
  async fn instant_query(
    &self,
    endpoint: &str,
    expression: &str,
  ) -> Result<Vec<RawSample>, QueryError>;
}
