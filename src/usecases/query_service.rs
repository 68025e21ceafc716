//! Query Service Use Case - History and Leaderboard Reads
//!
//! Read-side operations for the presentation layer. History is fetched
//! raw, compressed to actual changes and truncated to the most recent
//! entries; the leaderboard validates its size before touching storage.

use std::sync::Arc;

use tracing::instrument;

use super::balance_cache::BalanceCache;
use crate::domain::history::{compress, display_slice};
use crate::domain::leaderboard::{ValidationError, parse_limit};
use crate::domain::{BalanceSample, Identity};
use crate::ports::ledger::Ledger;
use crate::ports::name_resolver::NameResolver;

/// Outcome of a history lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
  /// No identity matches the requested name.
  PlayerNotFound,
  /// The identity exists but has no stored history.
  NoRecords {
    /// Resolved identity.
    identity: Identity,
  },
  /// Most recent changes, newest first.
  Changes {
    /// Resolved identity.
    identity: Identity,
    /// Compressed and truncated history.
    entries: Vec<BalanceSample>,
    /// Cached last-known balance, if any.
    current: Option<f64>,
  },
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
  /// 1-based rank.
  pub rank: usize,
  /// Ranked identity.
  pub identity: Identity,
  /// Display name, if resolvable.
  pub name: Option<String>,
  /// Balance from the identity's latest history row.
  pub balance: f64,
}

impl LeaderboardEntry {
  /// Name to show: the resolved name, else the identity itself.
  pub fn display_name(&self) -> String {
    self
      .name
      .clone()
      .unwrap_or_else(|| self.identity.to_string())
  }
}

/// Read-side service over the ledger, cache and name resolver.
pub struct QueryService<L: Ledger, N: NameResolver> {
  ledger: Arc<L>,
  names: Arc<N>,
  cache: Arc<BalanceCache>,
  /// Raw rows fetched per history query.
  raw_limit: usize,
  /// Compressed changes shown per history query.
  display_limit: usize,
  /// Leaderboard size when none is given.
  default_leaderboard_size: usize,
}

impl<L: Ledger, N: NameResolver> QueryService<L, N> {
  /// Create a query service.
  pub fn new(
    ledger: Arc<L>,
    names: Arc<N>,
    cache: Arc<BalanceCache>,
    raw_limit: usize,
    display_limit: usize,
    default_leaderboard_size: usize,
  ) -> Self {
    Self {
      ledger,
      names,
      cache,
      raw_limit,
      display_limit,
      default_leaderboard_size,
    }
  }

  /// Look up the compressed change history of a named identity.
  #[instrument(skip(self))]
  pub async fn history(&self, name: &str) -> HistoryOutcome {
    let Some(identity) = self.names.find_identity(name).await else {
      return HistoryOutcome::PlayerNotFound;
    };

    let raw = self.ledger.balance_history(identity, self.raw_limit).await;
    if raw.is_empty() {
      return HistoryOutcome::NoRecords { identity };
    }

    let changes = compress(&raw);
    HistoryOutcome::Changes {
      identity,
      entries: display_slice(&changes, self.display_limit).to_vec(),
      current: self.current_balance(&identity),
    }
  }

  /// Rank the top identities.
  ///
  /// `size` is validated and clamped to `[1, 100]` first; a non-numeric
  /// size is rejected without a storage query.
  #[instrument(skip(self))]
  pub async fn leaderboard(
    &self,
    size: Option<&str>,
  ) -> Result<Vec<LeaderboardEntry>, ValidationError> {
    let limit = parse_limit(size, self.default_leaderboard_size)?;
    let ranked = self.ledger.top_balances(limit).await;

    let mut entries = Vec::with_capacity(ranked.len());
    for (index, (identity, balance)) in ranked.into_iter().enumerate() {
      entries.push(LeaderboardEntry {
        rank: index + 1,
        identity,
        name: self.names.resolve_name(identity).await,
        balance,
      });
    }
    Ok(entries)
  }

  /// Cached last-known balance of an identity.
  pub fn current_balance(&self, identity: &Identity) -> Option<f64> {
    self.cache.get(identity)
  }
}
