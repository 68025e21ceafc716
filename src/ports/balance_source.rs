//! Balance Source Port - External Economy Interface
//!
//! The economy engine owns the authoritative balances. It is polled, never
//! pushed from, and every call may fail or stall independently.

use async_trait::async_trait;

use crate::domain::Identity;

/// Trait for balance providers.
#[async_trait]
pub trait BalanceSource: Send + Sync + 'static {
  /// Fetch the current balance of one identity.
  async fn get_balance(&self, identity: Identity) -> anyhow::Result<f64>;

  /// List every identity the economy knows about.
  async fn list_known_identities(&self) -> anyhow::Result<Vec<Identity>>;
}
