//! Fan-in of per-worker results.
//!
//! Merging works at the outer key level only. When both sides hold the same
//! partition key (or way id) the left-hand value is kept whole and the
//! right-hand value is dropped; inner per-class values are never summed.
//! Workers are expected to own disjoint tiles and countries, which makes the
//! drop unobservable in practice.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};

/// Combine two accumulators produced over disjoint partitions.
pub trait Merge: Sized {
    /// Return the union of `self` and `other`, keeping `self` on collisions.
    #[must_use]
    fn merge(self, other: Self) -> Self;
}

/// Left-fold any number of accumulators into one.
///
/// The first accumulator to mention a key wins it.
///
/// # Examples
///
/// ```
/// use roadstats_core::{MetricStore, RoadClass, merge_all};
///
/// let mut left = MetricStore::default();
/// left.add_tile_road(1, RoadClass::Trunk, 10.0);
/// let mut right = MetricStore::default();
/// right.add_tile_road(2, RoadClass::Trunk, 5.0);
///
/// let merged = merge_all([left, right]);
/// assert_eq!(merged.sorted_tile_ids(), vec![1, 2]);
/// ```
pub fn merge_all<T, I>(parts: I) -> T
where
    T: Merge + Default,
    I: IntoIterator<Item = T>,
{
    parts.into_iter().fold(T::default(), T::merge)
}

/// Move entries of `other` into `target` unless the key is already present.
pub(crate) fn keep_first<K, V, S>(target: &mut HashMap<K, V, S>, other: HashMap<K, V, S>)
where
    K: Eq + Hash,
    S: BuildHasher,
{
    for (key, value) in other {
        target.entry(key).or_insert(value);
    }
}

pub(crate) fn keep_first_ordered<K: Ord, V>(target: &mut BTreeMap<K, V>, other: BTreeMap<K, V>) {
    for (key, value) in other {
        target.entry(key).or_insert(value);
    }
}

pub(crate) fn union<K, S>(target: &mut HashSet<K, S>, other: HashSet<K, S>)
where
    K: Eq + Hash,
    S: BuildHasher,
{
    target.extend(other);
}
