//! Core balance-tracking domain types.
//!
//! Defines identities, persisted samples, and the significance rule that
//! decides whether an observed balance is worth a history row.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable account key supplied by the economy engine.
///
/// Stored as the 36-character hyphenated rendering.
pub type Identity = Uuid;

/// Absolute delta a balance must exceed to count as a change.
///
/// Applied uniformly regardless of balance magnitude.
pub const SIGNIFICANCE_EPSILON: f64 = 0.001;

/// A single persisted history row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSample {
    /// Account the sample belongs to.
    pub identity: Identity,
    /// Observation time in Unix milliseconds.
    pub timestamp_ms: i64,
    /// Observed balance.
    pub balance: f64,
}

/// How a freshly fetched balance relates to the last known one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeKind {
    /// No previous observation exists.
    New,
    /// The balance moved by more than [`SIGNIFICANCE_EPSILON`].
    Changed {
        /// Last known balance before this observation.
        previous: f64,
    },
    /// Within epsilon of the last known balance.
    Unchanged,
}

impl ChangeKind {
    /// Whether this observation must be written to the ledger.
    pub fn should_record(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Changed { .. } => write!(f, "changed"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Strict significance test: a delta of exactly epsilon does not count.
pub fn is_significant(previous: f64, current: f64) -> bool {
    (current - previous).abs() > SIGNIFICANCE_EPSILON
}

/// Classify a fetched balance against the cached last-known value.
pub fn classify(previous: Option<f64>, current: f64) -> ChangeKind {
    match previous {
        None => ChangeKind::New,
        Some(previous) if is_significant(previous, current) => {
            ChangeKind::Changed { previous }
        }
        Some(_) => ChangeKind::Unchanged,
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
