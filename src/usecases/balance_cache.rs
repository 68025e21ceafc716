//! Balance Cache - Last-known Balances in Memory
//!
//! Warm-loaded from the ledger at startup, read by the sampler and the
//! query service, and written only after a ledger commit succeeds.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::info;

use crate::domain::Identity;
use crate::ports::ledger::Ledger;

/// Concurrent identity → last-known balance map.
#[derive(Debug, Default)]
pub struct BalanceCache {
  balances: DashMap<Identity, f64>,
}

impl BalanceCache {
  /// Create an empty cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the whole cache with the ledger's last-known table.
  ///
  /// Returns the number of identities loaded.
  pub async fn warm_load<L: Ledger + ?Sized>(&self, ledger: &L) -> usize {
    let stored = ledger.last_balances().await;
    self.replace_all(stored);
    info!(count = self.len(), "Loaded player balances from database");
    self.len()
  }

  /// Replace every entry with `balances`.
  pub fn replace_all(&self, balances: HashMap<Identity, f64>) {
    self.balances.clear();
    for (identity, balance) in balances {
      self.balances.insert(identity, balance);
    }
  }

  /// Last-known balance for an identity.
  pub fn get(&self, identity: &Identity) -> Option<f64> {
    self.balances.get(identity).map(|entry| *entry.value())
  }

  /// Store a committed balance.
  pub fn set(&self, identity: Identity, balance: f64) {
    self.balances.insert(identity, balance);
  }

  /// Number of cached identities.
  pub fn len(&self) -> usize {
    self.balances.len()
  }

  /// Whether the cache holds no identities.
  pub fn is_empty(&self) -> bool {
    self.balances.is_empty()
  }

  /// Copy of the cache contents.
  pub fn snapshot(&self) -> HashMap<Identity, f64> {
    self
      .balances
      .iter()
      .map(|entry| (*entry.key(), *entry.value()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn test_set_and_get() {
    let cache = BalanceCache::new();
    let id = Uuid::new_v4();
    assert_eq!(cache.get(&id), None);
    cache.set(id, 12.5);
    assert_eq!(cache.get(&id), Some(12.5));
    cache.set(id, 13.0);
    assert_eq!(cache.get(&id), Some(13.0));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_replace_all_drops_stale_entries() {
    let cache = BalanceCache::new();
    let stale = Uuid::new_v4();
    let fresh = Uuid::new_v4();
    cache.set(stale, 1.0);

    cache.replace_all(HashMap::from([(fresh, 2.0)]));

    assert_eq!(cache.get(&stale), None);
    assert_eq!(cache.snapshot(), HashMap::from([(fresh, 2.0)]));
  }

  #[test]
  fn test_replace_all_with_nothing_empties_cache() {
    let cache = BalanceCache::new();
    cache.set(Uuid::new_v4(), 1.0);
    cache.replace_all(HashMap::new());
    assert!(cache.is_empty());
  }
}
