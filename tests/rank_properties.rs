// Test code is allowed to panic on failure
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

//! Property-based tests for the rank engine.
//!
//! Uses proptest to generate neighbor keys and insertion patterns and checks that every
//! generated key sorts strictly inside its gap.

use proptest::prelude::*;

use rankboard_core::{OrderKey, RankEngine, RankboardError};

/// Strategy for keys that have room below them (not made only of the lowest symbol).
fn valid_key() -> impl Strategy<Value = String> {
    "[a-z]{0,8}[b-z]"
}

/// Strategy for a strictly ordered pair of keys.
fn ordered_pair() -> impl Strategy<Value = (String, String)> {
    (valid_key(), valid_key())
        .prop_filter("keys must differ", |(a, b)| a != b)
        .prop_map(|(a, b)| if a < b { (a, b) } else { (b, a) })
}

proptest! {
    #[test]
    fn key_between_sorts_inside_gap((before, after) in ordered_pair()) {
        let engine = RankEngine::default();
        let before = OrderKey::new(before);
        let after = OrderKey::new(after);

        let key = engine.key_between(Some(&before), Some(&after)).unwrap();

        prop_assert!(before < key, "{} !< {}", before, key);
        prop_assert!(key < after, "{} !< {}", key, after);
    }

    #[test]
    fn key_before_sorts_lower(after in valid_key()) {
        let engine = RankEngine::default();
        let after = OrderKey::new(after);

        let key = engine.key_between(None, Some(&after)).unwrap();

        prop_assert!(key < after);
    }

    #[test]
    fn key_after_sorts_higher(before in "[a-z]{1,9}") {
        let engine = RankEngine::default();
        let before = OrderKey::new(before);

        let key = engine.key_between(Some(&before), None).unwrap();

        prop_assert!(key > before);
    }

    #[test]
    fn out_of_order_neighbors_fail((low, high) in ordered_pair()) {
        let engine = RankEngine::default();
        let low = OrderKey::new(low);
        let high = OrderKey::new(high);

        let reversed = engine.key_between(Some(&high), Some(&low));
        let reversed_is_invalid = matches!(reversed, Err(RankboardError::InvalidOrder { .. }));
        prop_assert!(reversed_is_invalid);

        let equal = engine.key_between(Some(&low), Some(&low));
        let equal_is_invalid = matches!(equal, Err(RankboardError::InvalidOrder { .. }));
        prop_assert!(equal_is_invalid);
    }

    #[test]
    fn key_between_is_deterministic((before, after) in ordered_pair()) {
        let engine = RankEngine::default();
        let before = OrderKey::new(before);
        let after = OrderKey::new(after);

        let first = engine.key_between(Some(&before), Some(&after)).unwrap();
        let second = engine.key_between(Some(&before), Some(&after)).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn random_insertions_stay_ordered(gaps in prop::collection::vec(any::<prop::sample::Index>(), 1..200)) {
        let engine = RankEngine::default();
        let mut keys: Vec<OrderKey> = Vec::new();

        for gap in gaps {
            let index = gap.index(keys.len() + 1);
            let before = index.checked_sub(1).map(|i| &keys[i]);
            let after = keys.get(index);
            let key = engine
                .key_between(before, after)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            if engine.needs_rebalancing(&key) {
                break;
            }
            keys.insert(index, key);
        }

        prop_assert!(RankEngine::is_strictly_increasing(&keys));
    }

    #[test]
    fn balanced_keys_are_strictly_increasing(count in 0usize..700) {
        let engine = RankEngine::default();

        let keys = engine.balanced_keys(count).unwrap();

        prop_assert_eq!(keys.len(), count);
        prop_assert!(RankEngine::is_strictly_increasing(&keys));
        prop_assert!(keys.iter().all(|k| !engine.needs_rebalancing(k)));
    }
}

#[test]
fn initial_key_is_constant() {
    let engine = RankEngine::default();
    let first = engine.key_between(None, None).unwrap();
    let second = engine.key_between(None, None).unwrap();

    assert_eq!(first.as_str(), "n");
    assert_eq!(first, second);
    assert_eq!(first, engine.initial_key());
}

#[test]
fn balanced_keys_for_documented_counts() {
    let engine = RankEngine::default();

    for count in [0usize, 1, 2, 25, 26, 100] {
        let keys = engine.balanced_keys(count).unwrap();
        assert_eq!(keys.len(), count, "count {}", count);
        assert!(RankEngine::is_strictly_increasing(&keys), "count {}", count);
    }
    assert_eq!(engine.balanced_keys(1).unwrap()[0], engine.initial_key());
}

#[test]
fn repeated_midpoints_between_fixed_bounds() {
    let engine = RankEngine::default();
    let low = OrderKey::from("b");
    let high = OrderKey::from("y");

    // Always insert directly after `low`, narrowing the same gap each time
    let mut inserted: Vec<OrderKey> = Vec::new();
    loop {
        let upper = inserted.last().unwrap_or(&high);
        let key = engine.key_between(Some(&low), Some(upper)).unwrap();
        if engine.needs_rebalancing(&key) {
            break;
        }
        inserted.push(key);
    }

    assert!(inserted.len() > 10);
    let mut sequence = vec![low];
    sequence.extend(inserted.into_iter().rev());
    sequence.push(high);
    assert!(RankEngine::is_strictly_increasing(&sequence));
}
