//! Retention Use Case - History Purge
//!
//! Deletes history rows older than the retention window. Last-known
//! balances are never touched, so the current state survives after its
//! supporting history is gone.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{info, instrument};

use crate::ports::ledger::Ledger;

/// Periodic history purger.
pub struct RetentionPurger<L: Ledger> {
  ledger: Arc<L>,
  /// Maximum history age in days.
  retention_days: u32,
}

impl<L: Ledger> RetentionPurger<L> {
  /// Create a purger for the given window.
  pub fn new(ledger: Arc<L>, retention_days: u32) -> Self {
    Self {
      ledger,
      retention_days,
    }
  }

  /// Retention window in days.
  pub fn retention_days(&self) -> u32 {
    self.retention_days
  }

  /// Run one purge; returns the number of rows deleted.
  #[instrument(skip(self), fields(retention_days = self.retention_days))]
  pub async fn purge_once(&self) -> u64 {
    info!("Starting purge of old balance records");
    self.ledger.purge_old_records(self.retention_days).await
  }
}

/// Wall-clock time of the first purge, for the startup log line.
pub fn next_run_at(initial_delay: Duration) -> DateTime<Local> {
  let delay = chrono::Duration::from_std(initial_delay).unwrap_or(chrono::Duration::zero());
  Local::now() + delay
}
