use crate::config::NeighborPolicy;
use crate::domain::sequence::{gap_at, rebalance};
use crate::domain::Orderable;
use crate::error::{EntityKind, ErrorKind, RankboardError, Result};
use crate::rank::{OrderKey, RankEngine};
use std::fmt;

/// Outcome of placing an item into a sequence
#[derive(Debug)]
pub(crate) struct Placement {
    pub(crate) key: OrderKey,
    /// Every item of the sequence was re-keyed and must be written back
    pub(crate) rebalanced: bool,
}

/// Finds a requested neighbor among the items of the destination sequence
///
/// A neighbor that is missing, deleted or outside the sequence fails the request under
/// [`NeighborPolicy::Strict`] and is ignored under [`NeighborPolicy::Lenient`].
pub(crate) fn neighbor_index<T, I>(
    items: &[T],
    id: Option<I>,
    id_of: impl Fn(&T) -> I,
    entity: EntityKind,
    policy: NeighborPolicy,
) -> Result<Option<usize>>
where
    I: PartialEq + fmt::Display,
{
    let Some(id) = id else {
        return Ok(None);
    };

    match items.iter().position(|item| id_of(item) == id) {
        Some(index) => Ok(Some(index)),
        None => match policy {
            NeighborPolicy::Lenient => {
                tracing::debug!(%entity, %id, "neighbor not in destination, ignoring it");
                Ok(None)
            }
            NeighborPolicy::Strict => Err(RankboardError::not_found(entity, id)),
        },
    }
}

/// Index at which a new item lands, from the indices of its requested neighbors
///
/// `before` is the item the new one follows, `after` the item it precedes. With only
/// one side given the other side is its adjacent item; with neither, the item is
/// appended. Both sides given must be in order.
pub(crate) fn insertion_index<T: Orderable>(
    items: &[T],
    before: Option<usize>,
    after: Option<usize>,
) -> Result<usize> {
    match (before, after) {
        (Some(b), Some(a)) if b >= a => Err(RankboardError::InvalidOrder {
            before: items[b].order_key().to_string(),
            after: items[a].order_key().to_string(),
        }),
        (Some(b), _) => Ok(b + 1),
        (None, Some(a)) => Ok(a),
        (None, None) => Ok(items.len()),
    }
}

/// Computes the key for an item inserted at `index` of an ordered sequence
///
/// When the key comes out too long, or the gap holds no key at all, the whole sequence
/// is rebalanced in place and the key is computed again against the new neighbors.
/// `items` must not contain the item being placed.
pub(crate) fn place<T: Orderable>(
    engine: &RankEngine,
    items: &mut [T],
    index: usize,
    sequence: &dyn fmt::Display,
) -> Result<Placement> {
    let (before, after) = gap_at(items, index);
    match engine.key_between(before, after) {
        Ok(key) if !engine.needs_rebalancing(&key) => {
            return Ok(Placement {
                key,
                rebalanced: false,
            })
        }
        Ok(key) => {
            tracing::debug!(%sequence, key = %key, "key too long");
        }
        Err(err) if err.kind() == ErrorKind::InvalidOrder => {
            tracing::debug!(%sequence, error = %err, "no room between neighbors");
        }
        Err(err) => return Err(err),
    }

    tracing::info!(%sequence, items = items.len(), "rebalancing sequence");
    rebalance(items, engine)?;

    let (before, after) = gap_at(items, index);
    let key = engine.key_between(before, after).map_err(|err| {
        RankboardError::RebalanceInvariant(format!("no key after rebalancing: {}", err))
    })?;
    if engine.needs_rebalancing(&key) {
        return Err(RankboardError::RebalanceInvariant(format!(
            "key '{}' still exceeds {} symbols after rebalancing",
            key,
            engine.max_key_length()
        )));
    }

    tracing::info!(%sequence, items = items.len(), "rebalanced sequence");
    Ok(Placement {
        key,
        rebalanced: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Card, CardId, ListId};

    fn cards(keys: &[&str]) -> Vec<Card> {
        let list = ListId::new();
        keys.iter()
            .map(|k| Card::new(list, format!("card {}", k), OrderKey::from(*k)))
            .collect()
    }

    #[test]
    fn test_neighbor_index_policies() {
        let items = cards(&["a", "n"]);
        let known = items[1].id;
        let unknown = CardId::new();

        let lookup = |id: Option<CardId>, policy| {
            neighbor_index(&items, id, |c| c.id, EntityKind::Card, policy)
        };

        assert_eq!(lookup(Some(known), NeighborPolicy::Strict).unwrap(), Some(1));
        assert_eq!(lookup(Some(unknown), NeighborPolicy::Lenient).unwrap(), None);
        assert!(matches!(
            lookup(Some(unknown), NeighborPolicy::Strict),
            Err(RankboardError::NotFound { .. })
        ));

        let absent = lookup(None, NeighborPolicy::Strict);
        assert_eq!(absent.unwrap(), None);
    }

    #[test]
    fn test_insertion_index() {
        let items = cards(&["a", "n", "z"]);

        assert_eq!(insertion_index(&items, Some(0), None).unwrap(), 1);
        assert_eq!(insertion_index(&items, None, Some(0)).unwrap(), 0);
        assert_eq!(insertion_index(&items, Some(0), Some(1)).unwrap(), 1);
        assert_eq!(insertion_index(&items, None, None).unwrap(), 3);

        let result = insertion_index(&items, Some(2), Some(1));
        assert!(matches!(result, Err(RankboardError::InvalidOrder { .. })));
    }

    #[test]
    fn test_place_without_rebalance() {
        let engine = RankEngine::default();
        let mut items = cards(&["a", "n", "z"]);

        let placement = place(&engine, &mut items, 1, &"list").unwrap();

        assert!(!placement.rebalanced);
        assert!(placement.key.as_str() > "a" && placement.key.as_str() < "n");
        assert_eq!(items[1].position.as_str(), "n");
    }

    #[test]
    fn test_place_rebalances_long_key() {
        let engine = RankEngine::default();
        let mut items = cards(&["a", "aaaaaaaaab"]);

        let placement = place(&engine, &mut items, 1, &"list").unwrap();

        assert!(placement.rebalanced);
        assert!(items[0].position < placement.key && placement.key < items[1].position);
        assert!(items.iter().all(|c| c.position.len() == 1));
    }

    #[test]
    fn test_place_rebalances_empty_gap() {
        let engine = RankEngine::default();
        let mut items = cards(&["a", "n"]);

        let placement = place(&engine, &mut items, 0, &"list").unwrap();

        assert!(placement.rebalanced);
        assert!(placement.key < items[0].position);
    }
}
