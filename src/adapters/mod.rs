//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies, and exposes the HTTP surface.
//!
//! Adapter categories:
//! - `http`: axum server for /probe and the exposition encoder
//! - `metrics`: exporter self-metrics and health checks
//! - `prometheus_api`: reqwest client for the backend query API

pub mod http;
pub mod metrics;
pub mod prometheus_api;
