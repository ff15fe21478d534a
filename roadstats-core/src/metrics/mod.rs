//! Per-worker accumulation of road metrics.
//!
//! A [`MetricStore`] keeps two [`PartitionMetrics`] tables, one keyed by
//! [`TileId`] and one by [`CountryCode`], alongside scalar tile attributes
//! and review flags. Every `add_*` call registers its key in the canonical
//! key set and adds `value` to `store[key][class]`.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use geo::Rect;
use paste::paste;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::merge::{Merge, keep_first, union};
use crate::{ClassTotals, CountryCode, RoadClass, TileId, WayId};

/// Partition key → per-class totals.
pub type MetricMap<K, V> = HashMap<K, ClassTotals<V>>;

/// Numeric values that can be summed into a [`ClassTotals`] slot.
pub trait Accumulate: Copy + Default {
    /// Add `value` to `self`.
    fn accumulate(&mut self, value: Self);
}

impl Accumulate for f64 {
    fn accumulate(&mut self, value: Self) {
        *self += value;
    }
}

impl Accumulate for u32 {
    fn accumulate(&mut self, value: Self) {
        *self = self.saturating_add(value);
    }
}

/// Review flag categories raised by the graph validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReviewCategory {
    /// Fork signage needs checking.
    Fork,
    /// Exit signage needs checking.
    Exit,
}

macro_rules! metric_families {
    ($( $(#[$doc:meta])* $adder:ident => $field:ident : $value:ty; )*) => {
        /// Every metric family for one kind of partition key.
        #[derive(Debug, Clone)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(
            feature = "serde",
            serde(bound(
                serialize = "K: Serialize + Eq + Hash",
                deserialize = "K: Deserialize<'de> + Eq + Hash"
            ))
        )]
        pub struct PartitionMetrics<K> {
            keys: HashSet<K>,
            $( $(#[$doc])* $field: MetricMap<K, $value>, )*
        }

        impl<K: Eq + Hash> PartialEq for PartitionMetrics<K> {
            fn eq(&self, other: &Self) -> bool {
                self.keys == other.keys $( && self.$field == other.$field )*
            }
        }

        impl<K> Default for PartitionMetrics<K> {
            fn default() -> Self {
                Self {
                    keys: HashSet::new(),
                    $( $field: HashMap::new(), )*
                }
            }
        }

        impl<K: Eq + Hash + Clone> PartitionMetrics<K> {
            paste! {
                $(
                    $(#[$doc])*
                    pub fn [<add_ $adder>](&mut self, key: K, class: RoadClass, value: $value) {
                        self.register(&key);
                        self.$field.entry(key).or_default().get_mut(class).accumulate(value);
                    }

                    $(#[$doc])*
                    pub fn $field(&self) -> &MetricMap<K, $value> {
                        &self.$field
                    }

                    $(#[$doc])*
                    ///
                    /// Absent keys read as zero.
                    pub fn [<$field _for>](&self, key: &K) -> ClassTotals<$value> {
                        self.$field.get(key).copied().unwrap_or_default()
                    }
                )*
            }
        }

        impl<K: Eq + Hash> Merge for PartitionMetrics<K> {
            fn merge(mut self, other: Self) -> Self {
                union(&mut self.keys, other.keys);
                $( keep_first(&mut self.$field, other.$field); )*
                self
            }
        }

        impl MetricStore {
            paste! {
                $(
                    #[doc = concat!("Add to the tile-keyed `", stringify!($field), "` family.")]
                    pub fn [<add_tile_ $adder>](&mut self, tile_id: TileId, class: RoadClass, value: $value) {
                        self.tiles.[<add_ $adder>](tile_id, class, value);
                    }

                    #[doc = concat!("Add to the country-keyed `", stringify!($field), "` family.")]
                    pub fn [<add_country_ $adder>](
                        &mut self,
                        code: impl Into<CountryCode>,
                        class: RoadClass,
                        value: $value,
                    ) {
                        self.countries.[<add_ $adder>](code.into(), class, value);
                    }

                    #[doc = concat!("Tile-keyed `", stringify!($field), "` family.")]
                    pub fn [<tile_ $field>](&self) -> &MetricMap<TileId, $value> {
                        self.tiles.$field()
                    }

                    #[doc = concat!("Country-keyed `", stringify!($field), "` family.")]
                    pub fn [<country_ $field>](&self) -> &MetricMap<CountryCode, $value> {
                        self.countries.$field()
                    }
                )*
            }
        }
    };
}

metric_families! {
    /// Total road length.
    road => lengths: f64;
    /// Length of one-way roads.
    one_way => one_way: f64;
    /// Length of roads carrying speed information.
    speed_info => speed_info: f64;
    /// Length of named roads.
    named => named: f64;
    /// Length of roads allowing hazardous materials.
    hazmat => hazmat: f64;
    /// Length of designated truck routes.
    truck_route => truck_route: f64;
    /// Count of internal intersection edges.
    int_edge => int_edges: u32;
    /// Count of height restrictions.
    height => height: u32;
    /// Count of width restrictions.
    width => width: u32;
    /// Count of length restrictions.
    length => length: u32;
    /// Count of weight restrictions.
    weight => weight: u32;
    /// Count of axle-load restrictions.
    axle_load => axle_load: u32;
}

impl<K: Eq + Hash + Clone> PartitionMetrics<K> {
    fn register(&mut self, key: &K) {
        if !self.keys.contains(key) {
            self.keys.insert(key.clone());
        }
    }

    /// Canonical key set: every key passed to an `add_*` call.
    pub fn keys(&self) -> &HashSet<K> {
        &self.keys
    }

    /// Whether no key has been registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Ord + Clone> PartitionMetrics<K> {
    /// Canonical keys in ascending order.
    pub fn sorted_keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.keys.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

/// Statistics accumulated by one graph-building worker.
///
/// # Examples
///
/// ```
/// use roadstats_core::{MetricStore, RoadClass};
///
/// let mut stats = MetricStore::default();
/// stats.add_tile_road(3, RoadClass::Trunk, 120.5);
/// stats.add_tile_road(3, RoadClass::Trunk, 4.5);
/// stats.add_country_road("NL", RoadClass::Trunk, 125.0);
///
/// assert_eq!(stats.tiles().lengths_for(&3).get(RoadClass::Trunk), 125.0);
/// assert_eq!(stats.tiles().lengths_for(&9).get(RoadClass::Trunk), 0.0);
/// assert!(stats.countries().keys().contains("NL"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricStore {
    tiles: PartitionMetrics<TileId>,
    countries: PartitionMetrics<CountryCode>,
    tile_areas: HashMap<TileId, f64>,
    tile_geometries: HashMap<TileId, Rect<f64>>,
    fork_signs: HashMap<WayId, bool>,
    exit_signs: HashMap<WayId, bool>,
}

impl MetricStore {
    /// Tile-keyed metrics.
    pub fn tiles(&self) -> &PartitionMetrics<TileId> {
        &self.tiles
    }

    /// Country-keyed metrics.
    pub fn countries(&self) -> &PartitionMetrics<CountryCode> {
        &self.countries
    }

    /// Canonical tile ids in ascending order.
    pub fn sorted_tile_ids(&self) -> Vec<TileId> {
        self.tiles.sorted_keys()
    }

    /// Canonical country codes in ascending order.
    pub fn sorted_country_codes(&self) -> Vec<CountryCode> {
        self.countries.sorted_keys()
    }

    /// Record the area of a tile, replacing any previous value.
    pub fn set_tile_area(&mut self, tile_id: TileId, area: f64) {
        self.tile_areas.insert(tile_id, area);
    }

    /// Record the bounding box of a tile, replacing any previous value.
    pub fn set_tile_geometry(&mut self, tile_id: TileId, bounds: Rect<f64>) {
        self.tile_geometries.insert(tile_id, bounds);
    }

    /// Area recorded for a tile, or zero.
    pub fn tile_area(&self, tile_id: TileId) -> f64 {
        self.tile_areas.get(&tile_id).copied().unwrap_or_default()
    }

    /// Bounding box recorded for a tile, if any.
    pub fn tile_geometry(&self, tile_id: TileId) -> Option<Rect<f64>> {
        self.tile_geometries.get(&tile_id).copied()
    }

    /// Every recorded tile area.
    pub fn tile_areas(&self) -> &HashMap<TileId, f64> {
        &self.tile_areas
    }

    /// Every recorded tile bounding box.
    pub fn tile_geometries(&self) -> &HashMap<TileId, Rect<f64>> {
        &self.tile_geometries
    }

    /// Upsert a review decision for `way_id`; the latest call wins.
    pub fn add_review_flag(&mut self, way_id: WayId, category: ReviewCategory, flagged: bool) {
        self.flags_mut(category).insert(way_id, flagged);
    }

    /// Review decisions recorded for `category`.
    pub fn review_flags(&self, category: ReviewCategory) -> &HashMap<WayId, bool> {
        match category {
            ReviewCategory::Fork => &self.fork_signs,
            ReviewCategory::Exit => &self.exit_signs,
        }
    }

    fn flags_mut(&mut self, category: ReviewCategory) -> &mut HashMap<WayId, bool> {
        match category {
            ReviewCategory::Fork => &mut self.fork_signs,
            ReviewCategory::Exit => &mut self.exit_signs,
        }
    }

    /// Whether nothing has been recorded for any tile or country.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.countries.is_empty()
    }
}

impl Merge for MetricStore {
    fn merge(mut self, other: Self) -> Self {
        self.tiles = self.tiles.merge(other.tiles);
        self.countries = self.countries.merge(other.countries);
        keep_first(&mut self.tile_areas, other.tile_areas);
        keep_first(&mut self.tile_geometries, other.tile_geometries);
        keep_first(&mut self.fork_signs, other.fork_signs);
        keep_first(&mut self.exit_signs, other.exit_signs);
        self
    }
}
