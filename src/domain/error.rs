//! Error Taxonomy - Typed Failures per Pipeline Stage
//!
//! Only `ConfigError` is fatal. Every other error is contained at the
//! rule or row level by the prober and logged; a scrape of a known
//! target always completes.

use thiserror::Error;

/// Configuration could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config file {path}: {source}")]
  Io {
    /// Path that was read.
    path: String,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// YAML parse failure.
  #[error("failed to parse YAML config: {0}")]
  Yaml(#[from] serde_yaml::Error),
  /// TOML parse failure.
  #[error("failed to parse TOML config: {0}")]
  Toml(#[from] toml::de::Error),
  /// The config parsed but violates a validation rule.
  #[error("invalid config: {0}")]
  Invalid(String),
}

/// A probe request that cannot be served at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
  /// The `target` query parameter is missing or empty.
  #[error("Missing target parameter")]
  MissingTarget,
  /// The target is not in the catalog.
  #[error("Target not found: {0}")]
  TargetNotFound(String),
}

/// A backend query failed as a whole. The rule is skipped.
#[derive(Debug, Error)]
pub enum QueryError {
  /// Connection, timeout, or body read failure.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  /// Non-success HTTP status without a decodable error envelope.
  #[error("backend returned HTTP {status}")]
  HttpStatus {
    /// HTTP status code.
    status: u16,
  },
  /// The response body is not a valid query envelope.
  #[error("undecodable response envelope: {0}")]
  Decode(#[from] serde_json::Error),
  /// The backend reported an error in its envelope.
  #[error("backend error ({error_type}): {message}")]
  Backend {
    /// Backend error category, e.g. `bad_data`.
    error_type: String,
    /// Backend error message.
    message: String,
  },
  /// The expression evaluated to a result type that has no gauge mapping.
  #[error("unsupported result type: {0}")]
  UnsupportedResultType(String),
}

/// A single result row carried a value that is not a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable sample value {value:?}")]
pub struct RowParseError {
  /// The raw string value as sent by the backend.
  pub value: String,
}

/// A tuple's label-name set differs from the descriptor fixed for its rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("label schema mismatch for {rule}: expected {expected:?}, found {found:?}")]
pub struct SchemaMismatchError {
  /// Rule (metric) name.
  pub rule: String,
  /// Label names fixed by the first observation.
  pub expected: Vec<String>,
  /// Label names of the rejected observation.
  pub found: Vec<String>,
}
