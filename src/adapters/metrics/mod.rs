//! Metrics and Monitoring Adapters
//!
//! Provides the exporter's own Prometheus metrics and the health
//! check endpoints (/live, /ready).

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use self::prometheus::ExporterMetrics;
