//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (SQLite, HTTP clients, HTTP server).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `economy`: Economy engine HTTP client (balances and names)
//! - `http`: axum server for probes, metrics and commands
//! - `metrics`: Prometheus metrics registry
//! - `persistence`: SQLite balance ledger

pub mod economy;
pub mod http;
pub mod metrics;
pub mod persistence;
