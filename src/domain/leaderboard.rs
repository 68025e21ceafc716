//! Leaderboard sizing and ranking rules.

use std::cmp::Ordering;

use thiserror::Error;

use super::balance::Identity;

/// Smallest leaderboard size a caller may request.
pub const MIN_LEADERBOARD_SIZE: usize = 1;

/// Largest leaderboard size a caller may request.
pub const MAX_LEADERBOARD_SIZE: usize = 100;

/// Rejected leaderboard arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The size argument is not an integer.
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// Clamp a requested size into `[1, 100]`.
pub fn clamp_limit(requested: i64) -> usize {
    let min = MIN_LEADERBOARD_SIZE as i64;
    let max = MAX_LEADERBOARD_SIZE as i64;
    // Bounded to [1, 100] so the cast cannot truncate.
    requested.clamp(min, max) as usize
}

/// Parse an optional user-supplied size argument.
///
/// A missing argument falls back to `default`; any argument that is present
/// must be an integer and is clamped afterwards.
pub fn parse_limit(arg: Option<&str>, default: usize) -> Result<usize, ValidationError> {
    match arg {
        None => Ok(clamp_limit(i64::try_from(default).unwrap_or(i64::MAX))),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(clamp_limit)
            .map_err(|_| ValidationError::InvalidNumber(raw.to_string())),
    }
}

/// Order balances descending, ties broken by identity ascending.
pub fn rank_order(a: &(Identity, f64), b: &(Identity, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Rank balances and keep the top `limit`.
pub fn top_n(mut balances: Vec<(Identity, f64)>, limit: usize) -> Vec<(Identity, f64)> {
    balances.sort_by(rank_order);
    balances.truncate(limit);
    balances
}
