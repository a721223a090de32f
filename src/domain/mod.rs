//! Domain Layer - Pure Exporter Logic
//!
//! Contains the catalog model, the dynamic metric registry, the TTL
//! cache, and the error taxonomy. Nothing here performs I/O.
//!
//! Sub-modules:
//! - `catalog`: Rule, Target, and the read-only target catalog
//! - `error`: typed errors for every pipeline stage
//! - `registry`: schema-on-first-write gauge registry
//! - `sample`: label tuples produced by rule evaluation
//! - `ttl_cache`: generic cache with per-entry expiry

pub mod catalog;
pub mod error;
pub mod registry;
pub mod sample;
pub mod ttl_cache;

pub use catalog::{Catalog, Rule, Target};
pub use registry::{MetricDescriptor, MetricRegistry, MetricSnapshot, SeriesSnapshot};
pub use sample::LabelTuple;
pub use ttl_cache::TtlCache;
