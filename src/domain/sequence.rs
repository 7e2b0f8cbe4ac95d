use crate::error::Result;
use crate::rank::{OrderKey, RankEngine};

/// An item whose display order within its sequence is given by an order key
pub trait Orderable {
    fn order_key(&self) -> &OrderKey;

    /// Replaces the key without touching any other state (versions included)
    fn set_order_key(&mut self, key: OrderKey);
}

/// Sorts items into display order (ascending key)
///
/// # Examples
/// ```
/// use rankboard_core::domain::{sequence::sort_sequence, Card, ListId};
/// use rankboard_core::rank::OrderKey;
///
/// let list = ListId::new();
/// let mut cards = vec![
///     Card::new(list, "C".to_string(), OrderKey::from("t")),
///     Card::new(list, "A".to_string(), OrderKey::from("g")),
///     Card::new(list, "B".to_string(), OrderKey::from("n")),
/// ];
///
/// sort_sequence(&mut cards);
/// assert_eq!(cards[0].title, "A");
/// ```
pub fn sort_sequence<T: Orderable>(items: &mut [T]) {
    items.sort_by(|a, b| a.order_key().cmp(b.order_key()));
}

/// Checks that items are in display order with no two sharing a key
pub fn is_strictly_ordered<T: Orderable>(items: &[T]) -> bool {
    items
        .windows(2)
        .all(|pair| pair[0].order_key() < pair[1].order_key())
}

/// Keys of the items immediately before and after `index` in an ordered slice
///
/// The item at `index` itself is excluded, so this is the gap an item is inserted
/// into when placed right after `items[index - 1]`.
pub fn gap_at<T: Orderable>(items: &[T], index: usize) -> (Option<&OrderKey>, Option<&OrderKey>) {
    let before = index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .map(Orderable::order_key);
    let after = items.get(index).map(Orderable::order_key);
    (before, after)
}

/// Re-keys a whole sequence with evenly spaced keys, preserving its current order
///
/// On error the items are sorted but no key has been modified.
pub fn rebalance<T: Orderable>(items: &mut [T], engine: &RankEngine) -> Result<()> {
    sort_sequence(items);
    let keys = engine.balanced_keys(items.len())?;
    for (item, key) in items.iter_mut().zip(keys) {
        item.set_order_key(key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Card, ListId};
    use crate::error::RankboardError;
    use crate::rank::RankConfig;

    fn cards(keys: &[&str]) -> Vec<Card> {
        let list = ListId::new();
        keys.iter()
            .map(|k| Card::new(list, format!("card {}", k), OrderKey::from(*k)))
            .collect()
    }

    #[test]
    fn test_sort_sequence() {
        let mut items = cards(&["t", "aan", "g", "n"]);
        sort_sequence(&mut items);

        let keys: Vec<&str> = items.iter().map(|c| c.position.as_str()).collect();
        assert_eq!(keys, vec!["aan", "g", "n", "t"]);
        assert!(is_strictly_ordered(&items));
    }

    #[test]
    fn test_duplicate_keys_are_not_strictly_ordered() {
        let items = cards(&["g", "g"]);
        assert!(!is_strictly_ordered(&items));
    }

    #[test]
    fn test_gap_at() {
        let items = cards(&["a", "n", "z"]);

        let (before, after) = gap_at(&items, 0);
        assert!(before.is_none());
        assert_eq!(after.map(OrderKey::as_str), Some("a"));

        let (before, after) = gap_at(&items, 1);
        assert_eq!(before.map(OrderKey::as_str), Some("a"));
        assert_eq!(after.map(OrderKey::as_str), Some("n"));

        let (before, after) = gap_at(&items, 3);
        assert_eq!(before.map(OrderKey::as_str), Some("z"));
        assert!(after.is_none());
    }

    #[test]
    fn test_rebalance_preserves_order() {
        let engine = RankEngine::default();
        let mut items = cards(&["aaaaaaaaaan", "aaaaaaaaab", "b", "a"]);
        let titles_in_order: Vec<String> = {
            let mut sorted = items.clone();
            sort_sequence(&mut sorted);
            sorted.into_iter().map(|c| c.title).collect()
        };

        rebalance(&mut items, &engine).unwrap();

        assert!(is_strictly_ordered(&items));
        assert!(items.iter().all(|c| c.position.len() == 1));
        let titles: Vec<String> = items.iter().map(|c| c.title.clone()).collect();
        assert_eq!(titles, titles_in_order);
    }

    #[test]
    fn test_rebalance_failure_leaves_keys() {
        let engine = RankEngine::new(RankConfig {
            max_key_length: 1,
            ..RankConfig::default()
        })
        .unwrap();
        let keys: Vec<String> = (0..30u8)
            .map(|i| format!("b{}", (b'b' + i % 24) as char))
            .collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let mut items = cards(&key_refs);
        let before: Vec<OrderKey> = items.iter().map(|c| c.position.clone()).collect();

        let result = rebalance(&mut items, &engine);

        assert!(matches!(result, Err(RankboardError::RebalanceInvariant(_))));
        let mut after: Vec<OrderKey> = items.iter().map(|c| c.position.clone()).collect();
        let mut expected = before;
        expected.sort();
        after.sort();
        assert_eq!(after, expected);
    }
}
