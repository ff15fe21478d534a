//! Builders for populated stores used by unit and behaviour tests.

use geo::{Coord, Rect};

use crate::{MetricStore, ReviewCollector, RoadClass, TileId};

/// Unit square anchored at `(x, y)`.
pub fn unit_bounds(x: f64, y: f64) -> Rect<f64> {
    Rect::new(Coord { x, y }, Coord { x: x + 1.0, y: y + 1.0 })
}

/// Store holding motorway and residential lengths for each tile, with an
/// area and bounding box recorded for every one of them.
pub fn store_with_tiles(tile_ids: &[TileId]) -> MetricStore {
    let mut stats = MetricStore::default();
    for (offset, tile_id) in tile_ids.iter().copied().enumerate() {
        let origin = f64::from(u32::try_from(offset).unwrap_or(u32::MAX));
        stats.add_tile_road(tile_id, RoadClass::Motorway, 10.0);
        stats.add_tile_road(tile_id, RoadClass::Residential, 2.5);
        stats.add_tile_one_way(tile_id, RoadClass::Motorway, 10.0);
        stats.add_tile_int_edge(tile_id, RoadClass::Residential, 1);
        stats.set_tile_area(tile_id, 12.5);
        stats.set_tile_geometry(tile_id, unit_bounds(origin, origin));
    }
    stats
}

/// Store holding a motorway length and truck attributes for each country.
pub fn store_with_countries(codes: &[&str]) -> MetricStore {
    let mut stats = MetricStore::default();
    for code in codes {
        stats.add_country_road(*code, RoadClass::Motorway, 100.0);
        stats.add_country_hazmat(*code, RoadClass::Motorway, 40.0);
        stats.add_country_weight(*code, RoadClass::Trunk, 2);
    }
    stats
}

/// Collector holding one two-point task per way id.
pub fn collector_with_ways(way_ids: &[u64]) -> ReviewCollector {
    let mut review = ReviewCollector::default();
    for way_id in way_ids {
        let start = Coord { x: 1.0, y: 2.0 };
        let end = Coord { x: 1.5, y: 2.5 };
        review.add_task(*way_id, start, vec![start, end]);
    }
    review
}
