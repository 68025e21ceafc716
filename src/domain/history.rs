//! History compression and display slicing.
//!
//! Raw history is stored without deduplication; these functions turn a
//! newest-first row sequence into the list of actual changes shown to users.

use super::balance::{BalanceSample, is_significant};

/// Default number of raw rows fetched per history query.
pub const DEFAULT_RAW_LIMIT: usize = 100;

/// Default number of compressed changes shown per history query.
pub const DEFAULT_DISPLAY_LIMIT: usize = 10;

/// Collapse consecutive near-equal samples into one representative.
///
/// Input must be newest-first. Each run keeps its first (most recent) sample;
/// a new run starts when a balance differs from the current representative by
/// more than the significance epsilon.
pub fn compress(samples: &[BalanceSample]) -> Vec<BalanceSample> {
    let mut changes: Vec<BalanceSample> = Vec::new();

    for sample in samples {
        match changes.last() {
            Some(last) if !is_significant(last.balance, sample.balance) => {}
            _ => changes.push(*sample),
        }
    }

    changes
}

/// Keep at most `limit` entries from the front of a newest-first sequence.
pub fn display_slice(changes: &[BalanceSample], limit: usize) -> &[BalanceSample] {
    &changes[..changes.len().min(limit)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn samples(balances: &[f64]) -> Vec<BalanceSample> {
        let id = Uuid::nil();
        balances
            .iter()
            .enumerate()
            .map(|(i, &balance)| BalanceSample {
                identity: id,
                timestamp_ms: 1_000_000 - i as i64,
                balance,
            })
            .collect()
    }

    fn balances(samples: &[BalanceSample]) -> Vec<f64> {
        samples.iter().map(|s| s.balance).collect()
    }

    #[test]
    fn test_compress_collapses_runs() {
        let raw = samples(&[100.0, 100.0, 100.0, 50.0, 50.0, 75.0]);
        assert_eq!(balances(&compress(&raw)), vec![100.0, 50.0, 75.0]);
    }

    #[test]
    fn test_compress_keeps_most_recent_of_run() {
        let raw = samples(&[20.0, 20.0, 10.0]);
        let compressed = compress(&raw);
        assert_eq!(compressed[0].timestamp_ms, raw[0].timestamp_ms);
        assert_eq!(compressed[1].timestamp_ms, raw[2].timestamp_ms);
    }

    #[test]
    fn test_compress_treats_epsilon_as_equal() {
        let raw = samples(&[10.0, 10.001, 10.0]);
        assert_eq!(compress(&raw).len(), 1);
    }

    #[test]
    fn test_compress_empty() {
        assert!(compress(&[]).is_empty());
    }

    #[test]
    fn test_display_slice_takes_newest() {
        let raw = samples(&(0..15).map(f64::from).collect::<Vec<_>>());
        let shown = display_slice(&raw, DEFAULT_DISPLAY_LIMIT);
        assert_eq!(shown.len(), 10);
        assert_eq!(shown[0].balance, 0.0);
        assert_eq!(shown[9].balance, 9.0);
    }

    #[test]
    fn test_display_slice_shorter_than_limit() {
        let raw = samples(&[1.0, 2.0]);
        assert_eq!(display_slice(&raw, 10).len(), 2);
    }
}
