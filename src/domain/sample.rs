//! Label tuples produced by evaluating a rule.

use std::collections::BTreeMap;

/// One result row: label pairs plus the parsed numeric value.
///
/// Labels are kept sorted by name so that the label-name set of two
/// tuples can be compared by iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTuple {
  /// Label name → value.
  pub labels: BTreeMap<String, String>,
  /// Sample value.
  pub value: f64,
}

impl LabelTuple {
  /// Create a tuple from label pairs and a value.
  pub fn new<K, V>(labels: impl IntoIterator<Item = (K, V)>, value: f64) -> Self
  where
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      labels: labels
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
      value,
    }
  }

  /// Sorted label names.
  pub fn label_names(&self) -> impl Iterator<Item = &str> {
    self.labels.keys().map(String::as_str)
  }

  /// Label values ordered by label name.
  pub fn label_values(&self) -> Vec<String> {
    self.labels.values().cloned().collect()
  }
}
