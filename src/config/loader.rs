//! Configuration Loader - File Loading and Validation
//!
//! Handles loading the rule file, validating all targets and rules,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use super::AppConfig;
use crate::domain::error::ConfigError;

/// Accepted config file syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
  /// YAML (the default).
  Yaml,
  /// TOML, selected by a `.toml` extension.
  Toml,
}

impl ConfigFormat {
  /// Pick the format from a file path.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
      _ => Self::Yaml,
    }
  }
}

/// Load and validate configuration from a file.
///
/// # Errors
/// Returns a `ConfigError` if:
/// - File doesn't exist or can't be read
/// - Parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.display().to_string(),
    source,
  })?;

  let config = load_from_str(&content, ConfigFormat::from_path(path))?;

  info!(
    path = %path.display(),
    targets = config.targets.len(),
    rules = config.targets.values().map(|t| t.rules.len()).sum::<usize>(),
    cache_ttl_seconds = config.query.cache_ttl_seconds,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AppConfig, ConfigError> {
  let config: AppConfig = match format {
    ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    ConfigFormat::Toml => toml::from_str(content)?,
  };
  validate_config(&config)?;
  Ok(config)
}

/// Upper bound for every `query.*_seconds` setting (one week).
pub const MAX_DURATION_SECONDS: u64 = 7 * 24 * 3600;

macro_rules! ensure {
  ($cond:expr, $($arg:tt)+) => {
    if !$cond {
      return Err(ConfigError::Invalid(format!($($arg)+)));
    }
  };
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - At least one target
/// - HTTP(S) endpoints
/// - Valid, per-target unique metric names
/// - Non-empty expressions
/// - A positive query timeout
/// - Durations no longer than `MAX_DURATION_SECONDS`
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
  ensure!(!config.targets.is_empty(), "At least one target must be configured");
  ensure!(
    config.query.timeout_seconds > 0,
    "query.timeout_seconds must be positive"
  );
  for (key, value) in [
    ("timeout_seconds", config.query.timeout_seconds),
    ("cache_ttl_seconds", config.query.cache_ttl_seconds),
    ("cache_cleanup_interval_seconds", config.query.cache_cleanup_interval_seconds),
  ] {
    ensure!(
      value <= MAX_DURATION_SECONDS,
      "query.{} must be at most {} (got {})",
      key,
      MAX_DURATION_SECONDS,
      value
    );
  }

  for (name, target) in &config.targets {
    ensure!(!name.is_empty(), "Target names must not be empty");
    ensure!(
      target.endpoint.starts_with("http://") || target.endpoint.starts_with("https://"),
      "Target {} has invalid endpoint {:?}: expected an http(s) URL",
      name,
      target.endpoint
    );

    let mut seen = HashSet::new();
    for (i, rule) in target.rules.iter().enumerate() {
      ensure!(
        is_valid_metric_name(&rule.record),
        "Target {} rule {} has invalid record name {:?}",
        name,
        i,
        rule.record
      );
      ensure!(
        !rule.expr.trim().is_empty(),
        "Target {} rule {} ({}) has empty expr",
        name,
        i,
        rule.record
      );
      ensure!(
        seen.insert(rule.record.as_str()),
        "Target {} declares rule {} more than once",
        name,
        rule.record
      );
    }
  }

  Ok(())
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
