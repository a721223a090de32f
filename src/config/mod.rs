//! Configuration Module - Target and Rule Definitions
//!
//! Loads and validates the exporter's rule file (YAML, or TOML when the
//! file has a `.toml` extension). The file maps target names to a
//! backend endpoint and the rules evaluated against it. The config is
//! read once at startup; there is no reload.

pub mod loader;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level exporter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Query tuning shared by every target.
  #[serde(default)]
  pub query: QueryConfig,
  /// Target name → rule group.
  pub targets: BTreeMap<String, TargetConfig>,
}

/// One probe target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
  /// Backend base URL, e.g. `http://prometheus:9090`.
  pub endpoint: String,
  /// Rules evaluated in order on every probe.
  #[serde(default)]
  pub rules: Vec<RuleConfig>,
}

/// A recording-rule style definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
  /// Exposed metric name.
  pub record: String,
  /// Query expression.
  pub expr: String,
}

/// Backend query and result cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
  /// Per-request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// How long a successful result is reused. 0 disables caching.
  #[serde(default = "default_cache_ttl")]
  pub cache_ttl_seconds: u64,
  /// Interval of the background sweep of expired cache entries.
  #[serde(default = "default_cleanup_interval")]
  pub cache_cleanup_interval_seconds: u64,
}

impl QueryConfig {
  /// Request timeout.
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }

  /// Cache TTL, or `None` when caching is disabled.
  pub fn cache_ttl(&self) -> Option<Duration> {
    (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
  }

  /// Cache sweep interval.
  pub fn cleanup_interval(&self) -> Duration {
    Duration::from_secs(self.cache_cleanup_interval_seconds.max(1))
  }
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      timeout_seconds: default_timeout(),
      cache_ttl_seconds: default_cache_ttl(),
      cache_cleanup_interval_seconds: default_cleanup_interval(),
    }
  }
}

// Default value functions for serde

fn default_timeout() -> u64 {
  50
}

fn default_cache_ttl() -> u64 {
  15
}

fn default_cleanup_interval() -> u64 {
  60
}
