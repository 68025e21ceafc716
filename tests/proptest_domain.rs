//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that the significance rule, history
//! compression and leaderboard sizing hold across random inputs.

use proptest::prelude::*;
use uuid::Uuid;

use balance_tracker::domain::balance::{ChangeKind, classify, is_significant};
use balance_tracker::domain::history::compress;
use balance_tracker::domain::leaderboard::{parse_limit, top_n};
use balance_tracker::domain::BalanceSample;

fn newest_first(balances: &[f64]) -> Vec<BalanceSample> {
    balances
        .iter()
        .enumerate()
        .map(|(i, &balance)| BalanceSample {
            identity: Uuid::nil(),
            timestamp_ms: 10_000_000 - i as i64,
            balance,
        })
        .collect()
}

/// Balances drawn from a coarse grid so runs of equal values are common.
fn balance_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0i32..20).prop_map(|n| f64::from(n) * 5.0),
        -1_000.0f64..1_000.0,
    ]
}

// ── Significance Rule ───────────────────────────────────────

proptest! {
    /// Folding observations through the cache records exactly the
    /// observations that differ significantly from the last recorded one.
    #[test]
    fn recorded_history_matches_reference_model(
        observed in prop::collection::vec(balance_strategy(), 0..60),
    ) {
        let mut cached: Option<f64> = None;
        let mut recorded = Vec::new();

        for &balance in &observed {
            let kind = classify(cached, balance);
            let expected = cached.map_or(true, |prev| (balance - prev).abs() > 0.001);
            prop_assert_eq!(kind.should_record(), expected);

            if kind.should_record() {
                recorded.push(balance);
                cached = Some(balance);
            }
        }

        // History written this way is already compressed.
        let history: Vec<f64> = recorded.iter().rev().copied().collect();
        prop_assert_eq!(compress(&newest_first(&history)).len(), history.len());
    }

    /// The first observation of an identity is always recorded.
    #[test]
    fn first_observation_always_new(balance in -1e9f64..1e9) {
        prop_assert_eq!(classify(None, balance), ChangeKind::New);
    }
}

// ── Compression ─────────────────────────────────────────────

proptest! {
    /// Compression keeps the newest sample and never grows the input.
    #[test]
    fn compress_keeps_head_and_shrinks(
        balances in prop::collection::vec(balance_strategy(), 1..80),
    ) {
        let raw = newest_first(&balances);
        let compressed = compress(&raw);
        prop_assert!(compressed.len() <= raw.len());
        prop_assert_eq!(compressed[0], raw[0]);
    }

    /// Adjacent compressed entries always differ significantly.
    #[test]
    fn compressed_neighbours_differ(
        balances in prop::collection::vec(balance_strategy(), 0..80),
    ) {
        let compressed = compress(&newest_first(&balances));
        for pair in compressed.windows(2) {
            prop_assert!(is_significant(pair[0].balance, pair[1].balance));
        }
    }

    /// Compression is idempotent and preserves newest-first order.
    #[test]
    fn compress_is_idempotent(
        balances in prop::collection::vec(balance_strategy(), 0..80),
    ) {
        let once = compress(&newest_first(&balances));
        prop_assert_eq!(compress(&once), once.clone());
        prop_assert!(once.windows(2).all(|w| w[0].timestamp_ms > w[1].timestamp_ms));
    }
}

// ── Leaderboard ─────────────────────────────────────────────

proptest! {
    /// Any integer argument is clamped into [1, 100].
    #[test]
    fn parsed_limit_is_clamped(n in any::<i64>()) {
        let limit = parse_limit(Some(&n.to_string()), 10).unwrap();
        prop_assert!((1..=100).contains(&limit));
    }

    /// Arguments containing letters are rejected.
    #[test]
    fn alphabetic_limit_rejected(arg in "[0-9]{0,3}[a-zA-Z]+[0-9]{0,3}") {
        prop_assert!(parse_limit(Some(&arg), 10).is_err());
    }

    /// Ranking is descending and bounded by the limit.
    #[test]
    fn top_n_is_sorted_and_bounded(
        balances in prop::collection::vec(balance_strategy(), 0..50),
        limit in 1usize..100,
    ) {
        let entries = balances
            .iter()
            .enumerate()
            .map(|(i, &b)| (Uuid::from_u128(i as u128), b))
            .collect();
        let ranked = top_n(entries, limit);
        prop_assert!(ranked.len() <= limit);
        prop_assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
