//! Rule Catalog - Immutable Target → Rules Mapping
//!
//! Built once from the loaded configuration and shared read-only by
//! every probe for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::error::ProbeError;

/// A named query whose result is exposed as one gauge metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
  /// Exposed metric name.
  pub name: String,
  /// Opaque query text sent to the backend.
  pub expression: String,
}

impl Rule {
  /// HELP text for the exposed metric.
  pub fn help(&self) -> String {
    format!("Value of Prometheus query: {}", self.expression)
  }
}

/// A named group of rules evaluated against one backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  /// Catalog key.
  pub name: String,
  /// Backend base URL, without trailing slash.
  pub endpoint: String,
  /// Rules in declared evaluation order.
  pub rules: Vec<Rule>,
}

/// Read-only catalog of probe targets.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  targets: HashMap<String, Arc<Target>>,
}

impl Catalog {
  /// Build a catalog from already-validated targets.
  pub fn new(targets: impl IntoIterator<Item = Target>) -> Self {
    Self {
      targets: targets
        .into_iter()
        .map(|t| (t.name.clone(), Arc::new(t)))
        .collect(),
    }
  }

  /// Build the catalog from the loaded configuration.
  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(config.targets.iter().map(|(name, group)| Target {
      name: name.clone(),
      endpoint: group.endpoint.trim_end_matches('/').to_string(),
      rules: group
        .rules
        .iter()
        .map(|r| Rule {
          name: r.record.clone(),
          expression: r.expr.clone(),
        })
        .collect(),
    }))
  }

  /// Resolve a target by name.
  pub fn resolve(&self, name: &str) -> Result<Arc<Target>, ProbeError> {
    self
      .targets
      .get(name)
      .cloned()
      .ok_or_else(|| ProbeError::TargetNotFound(name.to_string()))
  }

  /// Number of targets.
  pub fn len(&self) -> usize {
    self.targets.len()
  }

  /// Whether the catalog has no targets.
  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }
}
