//! Use Cases Layer - Application Orchestration
//!
//! Coordinates domain components and port implementations to serve
//! probes:
//!
//! - `QueryEvaluator`: backend query with result caching and row parsing
//! - `Prober`: resolve target → evaluate rules → observe → snapshot

pub mod evaluator;
pub mod prober;

pub use evaluator::{Evaluation, QueryEvaluator, QueryKey, ResultCache};
pub use prober::{ProbeOutcome, ProbeStats, Prober};
