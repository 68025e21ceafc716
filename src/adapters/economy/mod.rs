//! Economy Adapters - Balance Source over HTTP
//!
//! HTTP client for the economy engine's balance API. Implements the
//! `BalanceSource` and `NameResolver` ports.

pub mod client;
pub mod types;

pub use client::{EconomyClientConfig, HttpEconomyClient};
