//! Ledger Port - Durable Balance Store
//!
//! Two logical tables: append-only history and one last-known row per
//! identity. Every method is total from the caller's perspective;
//! implementations log storage faults and return a safe default.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{BalanceSample, Identity};

/// Result of a `record_balance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
  /// History row and last-known upsert both committed.
  Committed,
  /// Nothing was written; prior state is intact.
  RolledBack,
  /// The storage call outlived its timeout. The write may still commit
  /// afterwards, so the outcome is unknown.
  TimedOut,
}

impl RecordOutcome {
  /// Whether the write is durable.
  pub fn is_committed(self) -> bool {
    matches!(self, Self::Committed)
  }
}

/// Trait for balance ledgers.
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
  /// Atomically append a history row stamped now and upsert last-known.
  async fn record_balance(&self, identity: Identity, balance: f64) -> RecordOutcome;

  /// The full last-known table, used to warm the cache at startup.
  async fn last_balances(&self) -> HashMap<Identity, f64>;

  /// Raw history rows, newest first, at most `raw_limit`.
  async fn balance_history(&self, identity: Identity, raw_limit: usize) -> Vec<BalanceSample>;

  /// Most recent history row per identity, descending by balance.
  async fn top_balances(&self, limit: usize) -> Vec<(Identity, f64)>;

  /// Delete history rows older than the window; returns the deleted count.
  async fn purge_old_records(&self, retention_days: u32) -> u64;

  /// Release the storage handle. Safe to call more than once.
  async fn close(&self);
}
