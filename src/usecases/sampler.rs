//! Balance Sampler Use Case - Change-triggered Recording
//!
//! Polls the economy for every known identity, compares the result with
//! the cache, and writes to the ledger only on a significant change.
//! Also provides the top-N snapshot mode, which records the richest
//! identities unconditionally.
//!
//! Sampling flow:
//! 1. List known identities
//! 2. For each identity: fetch, classify against cache, record if needed
//! 3. Update the cache only after a committed write
//! 4. Log and return a batch report

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::balance_cache::BalanceCache;
use crate::domain::balance::{ChangeKind, classify};
use crate::domain::leaderboard::top_n;
use crate::domain::Identity;
use crate::ports::balance_source::BalanceSource;
use crate::ports::ledger::{Ledger, RecordOutcome};

/// Why a single identity could not be sampled.
#[derive(Debug, Error)]
pub enum SampleError {
  /// The economy call failed.
  #[error("balance fetch failed: {0}")]
  Fetch(#[source] anyhow::Error),
  /// The economy returned NaN or infinity.
  #[error("balance source returned a non-finite value: {0}")]
  NonFinite(f64),
  /// The ledger rolled the write back.
  #[error("ledger write rolled back")]
  RolledBack,
  /// The ledger did not confirm the write in time.
  #[error("ledger write timed out, outcome unknown")]
  TimedOut,
}

/// Summary of one sampling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleReport {
  /// Identities processed.
  pub checked: usize,
  /// First observations recorded.
  pub new: usize,
  /// Significant changes recorded.
  pub changed: usize,
  /// Observations within epsilon.
  pub skipped: usize,
  /// Fetch or record failures.
  pub failed: usize,
  /// Duration of the run in milliseconds.
  pub duration_ms: u64,
}

impl SampleReport {
  /// Rows written by this run.
  pub fn recorded(&self) -> usize {
    self.new + self.changed
  }
}

/// Summary of one top-N snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
  /// Balances fetched successfully.
  pub fetched: usize,
  /// Rows written.
  pub recorded: usize,
  /// Fetch or record failures.
  pub failed: usize,
}

/// Periodic balance sampler.
///
/// The change check and the top-N snapshot may run concurrently on one
/// sampler; their writes are serialized so the cache lands in commit order.
pub struct BalanceSampler<S: BalanceSource, L: Ledger> {
  source: Arc<S>,
  ledger: Arc<L>,
  cache: Arc<BalanceCache>,
  /// Held across a ledger write and the cache update that follows it.
  write_lock: Mutex<()>,
}

impl<S: BalanceSource, L: Ledger> BalanceSampler<S, L> {
  /// Create a new sampler over shared source, ledger and cache.
  pub fn new(source: Arc<S>, ledger: Arc<L>, cache: Arc<BalanceCache>) -> Self {
    Self {
      source,
      ledger,
      cache,
      write_lock: Mutex::new(()),
    }
  }

  /// Run one change-detection pass over every known identity.
  ///
  /// Failures are isolated per identity; the batch always completes.
  #[instrument(skip(self))]
  pub async fn sample_once(&self) -> SampleReport {
    let started = Instant::now();
    let mut report = SampleReport::default();

    let identities = match self.source.list_known_identities().await {
      Ok(identities) => identities,
      Err(e) => {
        warn!(error = %e, "Failed to list known identities, skipping run");
        return report;
      }
    };

    debug!(identities = identities.len(), "Starting balance check");

    for identity in identities {
      report.checked += 1;
      match self.sample_identity(identity).await {
        Ok(ChangeKind::New) => report.new += 1,
        Ok(ChangeKind::Changed { .. }) => report.changed += 1,
        Ok(ChangeKind::Unchanged) => report.skipped += 1,
        Err(e) => {
          report.failed += 1;
          warn!(identity = %identity, error = %e, "Failed to check balance");
        }
      }
    }

    report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if report.recorded() > 0 || report.failed > 0 {
      info!(
        recorded = report.recorded(),
        new = report.new,
        changed = report.changed,
        failed = report.failed,
        checked = report.checked,
        duration_ms = report.duration_ms,
        "Balance check complete"
      );
    } else {
      debug!(checked = report.checked, "No balance changes detected");
    }

    report
  }

  /// Fetch, classify and (if significant) record one identity.
  pub async fn sample_identity(&self, identity: Identity) -> Result<ChangeKind, SampleError> {
    let current = self.fetch(identity).await?;
    let kind = classify(self.cache.get(&identity), current);

    match kind {
      ChangeKind::New => debug!(identity = %identity, balance = current, "New player detected"),
      ChangeKind::Changed { previous } => debug!(
        identity = %identity,
        previous,
        current,
        "Balance change"
      ),
      ChangeKind::Unchanged => return Ok(kind),
    }

    self.record(identity, current).await?;
    Ok(kind)
  }

  /// Record the top `k` balances unconditionally.
  ///
  /// Ranks every fetchable identity descending by balance (ties by
  /// identity) and writes the first `k`, ignoring the significance rule.
  #[instrument(skip(self))]
  pub async fn snapshot_top_once(&self, k: usize) -> SnapshotReport {
    let mut report = SnapshotReport::default();

    let identities = match self.source.list_known_identities().await {
      Ok(identities) => identities,
      Err(e) => {
        warn!(error = %e, "Failed to list known identities, skipping snapshot");
        return report;
      }
    };

    let mut balances = Vec::with_capacity(identities.len());
    for identity in identities {
      match self.fetch(identity).await {
        Ok(balance) => balances.push((identity, balance)),
        Err(e) => {
          report.failed += 1;
          warn!(identity = %identity, error = %e, "Failed to fetch balance for snapshot");
        }
      }
    }
    report.fetched = balances.len();

    for (identity, balance) in top_n(balances, k) {
      match self.record(identity, balance).await {
        Ok(()) => report.recorded += 1,
        Err(e) => {
          report.failed += 1;
          warn!(identity = %identity, error = %e, "Failed to record snapshot balance");
        }
      }
    }

    info!(
      recorded = report.recorded,
      fetched = report.fetched,
      failed = report.failed,
      top_n = k,
      "Top balance snapshot complete"
    );

    report
  }

  async fn fetch(&self, identity: Identity) -> Result<f64, SampleError> {
    let balance = self
      .source
      .get_balance(identity)
      .await
      .map_err(SampleError::Fetch)?;

    if balance.is_finite() {
      Ok(balance)
    } else {
      Err(SampleError::NonFinite(balance))
    }
  }

  /// Write to the ledger; the cache follows only a committed write.
  ///
  /// A timed-out write leaves the cache alone: if it did land, the next
  /// check sees a stale cache and records the balance again.
  async fn record(&self, identity: Identity, balance: f64) -> Result<(), SampleError> {
    let _guard = self.write_lock.lock().await;
    match self.ledger.record_balance(identity, balance).await {
      RecordOutcome::Committed => {
        self.cache.set(identity, balance);
        Ok(())
      }
      RecordOutcome::RolledBack => Err(SampleError::RolledBack),
      RecordOutcome::TimedOut => Err(SampleError::TimedOut),
    }
  }
}
