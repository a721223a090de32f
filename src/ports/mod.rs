//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `QueryBackend`: instant queries against a time-series backend

pub mod query_backend;

pub use query_backend::{QueryBackend, RawSample};
