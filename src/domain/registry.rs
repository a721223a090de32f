//! Dynamic Metric Registry - Schema-on-First-Write Gauges
//!
//! Maps a rule name to a lazily created gauge family whose label-name
//! set is fixed by the first tuple ever observed for that rule. Later
//! tuples must carry exactly the same label names.
//!
//! Lifetime policy:
//! - A descriptor, once created, lives for the whole process and is
//!   never replaced.
//! - A series is created on first observation of its label values and
//!   is never evicted. A series that stops being reported keeps being
//!   exposed at its last value.
//!
//! Locking: the descriptor map is behind one `RwLock` that is held only
//! long enough to look up or insert a family; each family's series map
//! has its own `Mutex`. Observations for unrelated rules never contend
//! on the same series lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::domain::catalog::Rule;
use crate::domain::error::SchemaMismatchError;
use crate::domain::sample::LabelTuple;

/// Fixed schema of one exposed metric. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
  /// Metric (rule) name.
  pub name: String,
  /// HELP text.
  pub help: String,
  /// Sorted label names shared by every series.
  pub label_names: Vec<String>,
}

impl MetricDescriptor {
  fn matches(&self, tuple: &LabelTuple) -> bool {
    tuple.labels.len() == self.label_names.len()
      && tuple
        .label_names()
        .zip(&self.label_names)
        .all(|(a, b)| a == b)
  }
}

/// One label-value combination with its latest value.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
  /// Label values, ordered like the descriptor's label names.
  pub label_values: Vec<String>,
  /// Last observed value.
  pub value: f64,
}

/// Consistent copy of one metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
  /// The family's descriptor.
  pub descriptor: Arc<MetricDescriptor>,
  /// All series, ordered by label values.
  pub series: Vec<SeriesSnapshot>,
}

/// A registered family: immutable descriptor plus its mutable series.
#[derive(Debug)]
struct MetricFamily {
  descriptor: Arc<MetricDescriptor>,
  series: Mutex<BTreeMap<Vec<String>, f64>>,
}

impl MetricFamily {
  fn snapshot(&self) -> MetricSnapshot {
    let series = self.series.lock();
    MetricSnapshot {
      descriptor: Arc::clone(&self.descriptor),
      series: series
        .iter()
        .map(|(values, value)| SeriesSnapshot {
          label_values: values.clone(),
          value: *value,
        })
        .collect(),
    }
  }
}

/// Process-wide registry of rule gauges.
///
/// Constructed once at startup and shared by handle with every probe,
/// so values persist across scrapes.
#[derive(Debug, Default)]
pub struct MetricRegistry {
  families: RwLock<BTreeMap<String, Arc<MetricFamily>>>,
}

impl MetricRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Record one tuple under `rule`.
  ///
  /// Creates the rule's descriptor from this tuple's label names if none
  /// exists yet. Otherwise the label names must match the descriptor
  /// exactly; on mismatch nothing is changed. The series keyed by the
  /// tuple's label values is set to the tuple's value (last write wins).
  pub fn observe(&self, rule: &Rule, tuple: &LabelTuple) -> Result<(), SchemaMismatchError> {
    let family = self.family_for(rule, tuple);
    let descriptor = &family.descriptor;

    if !descriptor.matches(tuple) {
      return Err(SchemaMismatchError {
        rule: rule.name.clone(),
        expected: descriptor.label_names.clone(),
        found: tuple.label_names().map(str::to_string).collect(),
      });
    }

    family.series.lock().insert(tuple.label_values(), tuple.value);
    Ok(())
  }

  /// Look up the family for `rule`, creating it from `tuple` if absent.
  fn family_for(&self, rule: &Rule, tuple: &LabelTuple) -> Arc<MetricFamily> {
    if let Some(family) = self.families.read().get(&rule.name) {
      return Arc::clone(family);
    }

    let mut families = self.families.write();
    let family = families.entry(rule.name.clone()).or_insert_with(|| {
      let descriptor = MetricDescriptor {
        name: rule.name.clone(),
        help: rule.help(),
        label_names: tuple.label_names().map(str::to_string).collect(),
      };
      debug!(
        rule = %rule.name,
        labels = ?descriptor.label_names,
        "Registered metric descriptor"
      );
      Arc::new(MetricFamily {
        descriptor: Arc::new(descriptor),
        series: Mutex::new(BTreeMap::new()),
      })
    });
    Arc::clone(family)
  }

  /// Descriptor for `name`, if one has been registered.
  pub fn descriptor(&self, name: &str) -> Option<Arc<MetricDescriptor>> {
    self
      .families
      .read()
      .get(name)
      .map(|f| Arc::clone(&f.descriptor))
  }

  /// Every family, ordered by name.
  pub fn snapshot(&self) -> Vec<MetricSnapshot> {
    self.families.read().values().map(|f| f.snapshot()).collect()
  }

  /// The families for `names`, in the given order. Names that have
  /// never been observed are absent from the result.
  pub fn snapshot_of<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<MetricSnapshot> {
    let families = self.families.read();
    names
      .into_iter()
      .filter_map(|name| families.get(name))
      .map(|f| f.snapshot())
      .collect()
  }

  /// Number of registered families.
  pub fn len(&self) -> usize {
    self.families.read().len()
  }

  /// Whether no family has been registered yet.
  pub fn is_empty(&self) -> bool {
    self.families.read().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rule(name: &str) -> Rule {
    Rule {
      name: name.to_string(),
      expression: format!("sum({name})"),
    }
  }

  #[test]
  fn test_first_observation_fixes_descriptor() {
    let registry = MetricRegistry::new();
    let r = rule("up_sum");
    registry
      .observe(&r, &LabelTuple::new([("job", "node"), ("env", "prod")], 3.0))
      .unwrap();

    let d = registry.descriptor("up_sum").unwrap();
    assert_eq!(d.label_names, vec!["env", "job"]);
    assert_eq!(d.help, "Value of Prometheus query: sum(up_sum)");
  }

  #[test]
  fn test_schema_mismatch_leaves_series_unchanged() {
    let registry = MetricRegistry::new();
    let r = rule("up_sum");
    registry
      .observe(&r, &LabelTuple::new([("job", "node")], 3.0))
      .unwrap();

    let err = registry
      .observe(&r, &LabelTuple::new([("job", "node"), ("instance", "a")], 9.0))
      .unwrap_err();
    assert_eq!(err.expected, vec!["job"]);
    assert_eq!(err.found, vec!["instance", "job"]);

    // Fewer labels is a mismatch too.
    assert!(registry.observe(&r, &LabelTuple::new::<&str, &str>([], 1.0)).is_err());

    let snap = registry.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].series.len(), 1);
    assert_eq!(snap[0].series[0].value, 3.0);
  }

  #[test]
  fn test_last_write_wins() {
    let registry = MetricRegistry::new();
    let r = rule("x");
    registry.observe(&r, &LabelTuple::new([("a", "1")], 1.0)).unwrap();
    registry.observe(&r, &LabelTuple::new([("a", "1")], 7.5)).unwrap();
    registry.observe(&r, &LabelTuple::new([("a", "2")], 2.0)).unwrap();

    let snap = registry.snapshot();
    assert_eq!(
      snap[0].series,
      vec![
        SeriesSnapshot { label_values: vec!["1".to_string()], value: 7.5 },
        SeriesSnapshot { label_values: vec!["2".to_string()], value: 2.0 },
      ]
    );
  }

  #[test]
  fn test_snapshot_of_keeps_requested_order_and_skips_unknown() {
    let registry = MetricRegistry::new();
    for name in ["b", "a"] {
      registry
        .observe(&rule(name), &LabelTuple::new::<&str, &str>([], 1.0))
        .unwrap();
    }

    let names: Vec<String> = registry
      .snapshot_of(["b", "missing", "a"])
      .into_iter()
      .map(|m| m.descriptor.name.clone())
      .collect();
    assert_eq!(names, vec!["b", "a"]);

    let all: Vec<String> = registry
      .snapshot()
      .into_iter()
      .map(|m| m.descriptor.name.clone())
      .collect();
    assert_eq!(all, vec!["a", "b"]);
  }

  #[test]
  fn test_descriptor_never_replaced() {
    let registry = MetricRegistry::new();
    let first = Rule { name: "m".to_string(), expression: "first".to_string() };
    let second = Rule { name: "m".to_string(), expression: "second".to_string() };
    registry.observe(&first, &LabelTuple::new([("a", "1")], 1.0)).unwrap();
    registry.observe(&second, &LabelTuple::new([("a", "2")], 2.0)).unwrap();

    let d = registry.descriptor("m").unwrap();
    assert_eq!(d.help, "Value of Prometheus query: first");
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn test_concurrent_observes_do_not_lose_series() {
    let registry = Arc::new(MetricRegistry::new());
    let handles: Vec<_> = (0..8)
      .map(|t| {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
          let r = rule(&format!("rule_{}", t % 2));
          for i in 0..100 {
            let tuple = LabelTuple::new([("thread", t.to_string()), ("i", i.to_string())], f64::from(i));
            registry.observe(&r, &tuple).unwrap();
          }
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }

    let snap = registry.snapshot();
    assert_eq!(snap.len(), 2);
    assert_eq!(snap.iter().map(|m| m.series.len()).sum::<usize>(), 800);
  }
}
