//! HTTP Adapters - Probes, Metrics and Commands
//!
//! axum server exposing liveness/readiness probes, the Prometheus
//! registry and the history/leaderboard command surface.

pub mod server;

pub use server::{ServerState, router, serve};
