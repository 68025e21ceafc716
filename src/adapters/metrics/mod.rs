//! Metrics Adapters
//!
//! Prometheus registry for sampling, recording and purge counters.
//! Served on `/metrics` by `crate::adapters::http`.

pub mod prometheus;

pub use self::prometheus::MetricsRegistry;
