//! HTTP Surface Adapter
//!
//! Sub-modules:
//! - `exposition`: renders registry snapshots in the text format
//! - `server`: axum router and graceful-shutdown serve loop

pub mod exposition;
pub mod server;

pub use server::{AppState, ProbeParams, drain, router, serve};
