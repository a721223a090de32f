//! Prometheus HTTP API Adapter
//!
//! Implements the `QueryBackend` port against a Prometheus-compatible
//! `/api/v1/query` endpoint (Prometheus, Thanos, Mimir, VictoriaMetrics).
//!
//! Sub-modules:
//! - `client`: reqwest client with a bounded timeout
//! - `types`: typed response envelope and decoding

pub mod client;
pub mod types;

pub use client::{PrometheusClient, PrometheusClientConfig};
