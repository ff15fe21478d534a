//! Row writers for the summary and per-class tables.

use std::fmt::Display;
use std::hash::Hash;

use log::error;
use roadstats_core::{CountryCode, MetricStore, PartitionMetrics, RoadClass, TileId};
use rusqlite::types::{ToSql, Value};
use rusqlite::{Statement, Transaction, params};

use super::schema::{self, PartitionTables, TILE_TABLES};
use super::spatial::polygon_wkt;
use super::{PersistStatsError, TableReport};

/// Key type of a statistics partition.
pub(super) trait PartitionKey: Eq + Hash + Clone + Display {
    fn sql_value(&self) -> Value;
}

impl PartitionKey for TileId {
    fn sql_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl PartitionKey for CountryCode {
    fn sql_value(&self) -> Value {
        Value::Text(self.as_str().to_owned())
    }
}

fn prepare<'tx>(
    transaction: &'tx Transaction<'_>,
    table: &'static str,
    sql: &str,
) -> Result<Statement<'tx>, PersistStatsError> {
    transaction
        .prepare(sql)
        .map_err(|source| PersistStatsError::PrepareInsert { table, source })
}

impl TableReport {
    fn record(&mut self, row: &dyn Display, outcome: rusqlite::Result<usize>) {
        match outcome {
            Ok(_) => self.rows_written += 1,
            Err(err) => {
                error!("Failed to insert {row} into {}: {err}", self.table);
                self.rows_failed += 1;
            }
        }
    }
}

/// Write one `tiledata` row per tile.
///
/// Returns the table report and the number of tiles that had no geometry.
pub(super) fn insert_tile_summaries(
    transaction: &Transaction<'_>,
    stats: &MetricStore,
    tile_ids: &[TileId],
) -> Result<(TableReport, usize), PersistStatsError> {
    let table = TILE_TABLES.summary;
    let mut statement = prepare(transaction, table, &schema::tile_summary_insert())?;
    let mut report = TableReport::new(table);
    let mut missing_geometry = 0;

    for tile_id in tile_ids {
        let lengths = stats.tiles().lengths_for(tile_id);
        let area = stats.tile_area(*tile_id);
        let total = lengths.total();
        let geometry = stats
            .tile_geometry(*tile_id)
            .map(|bounds| polygon_wkt(&bounds));
        if geometry.is_none() {
            error!("Geometry for tile {tile_id} not found");
            missing_geometry += 1;
        }

        let per_class = RoadClass::ALL.map(|class| lengths.get(class));

        let mut values: Vec<&dyn ToSql> = vec![tile_id, &area, &total];
        values.extend(per_class.iter().map(|length| length as &dyn ToSql));
        values.push(&geometry);
        report.record(&format_args!("tile {tile_id}"), statement.execute(values.as_slice()));
    }
    Ok((report, missing_geometry))
}

/// Write one `countrydata` row per country.
pub(super) fn insert_country_summaries(
    transaction: &Transaction<'_>,
    stats: &MetricStore,
    codes: &[CountryCode],
) -> Result<TableReport, PersistStatsError> {
    let table = schema::COUNTRY_TABLES.summary;
    let mut statement = prepare(transaction, table, &schema::country_summary_insert())?;
    let mut report = TableReport::new(table);

    for code in codes {
        let lengths = stats.countries().lengths_for(code);
        let per_class = RoadClass::ALL.map(|class| lengths.get(class));
        let iso = code.as_str();

        let mut values: Vec<&dyn ToSql> = vec![&iso];
        values.extend(per_class.iter().map(|length| length as &dyn ToSql));
        report.record(&format_args!("country {code}"), statement.execute(values.as_slice()));
    }
    Ok(report)
}

/// Write general attributes for every key and road class.
pub(super) fn insert_class_rows<K: PartitionKey>(
    transaction: &Transaction<'_>,
    tables: &PartitionTables,
    metrics: &PartitionMetrics<K>,
    keys: &[K],
) -> Result<TableReport, PersistStatsError> {
    let table = tables.classes;
    let mut statement = prepare(transaction, table, &schema::class_insert(tables))?;
    let mut report = TableReport::new(table);

    for key in keys {
        let key_value = key.sql_value();
        let one_way = metrics.one_way_for(key);
        let speed_info = metrics.speed_info_for(key);
        let int_edges = metrics.int_edges_for(key);
        let named = metrics.named_for(key);
        for class in RoadClass::ALL {
            let outcome = statement.execute(params![
                key_value,
                class.as_str(),
                one_way.get(class),
                speed_info.get(class),
                int_edges.get(class),
                named.get(class),
            ]);
            report.record(&format_args!("{key} {class}"), outcome);
        }
    }
    Ok(report)
}

/// Write truck restrictions for every key and road class.
pub(super) fn insert_truck_rows<K: PartitionKey>(
    transaction: &Transaction<'_>,
    tables: &PartitionTables,
    metrics: &PartitionMetrics<K>,
    keys: &[K],
) -> Result<TableReport, PersistStatsError> {
    let table = tables.truck;
    let mut statement = prepare(transaction, table, &schema::truck_insert(tables))?;
    let mut report = TableReport::new(table);

    for key in keys {
        let key_value = key.sql_value();
        let hazmat = metrics.hazmat_for(key);
        let truck_route = metrics.truck_route_for(key);
        let height = metrics.height_for(key);
        let width = metrics.width_for(key);
        let length = metrics.length_for(key);
        let weight = metrics.weight_for(key);
        let axle_load = metrics.axle_load_for(key);
        for class in RoadClass::ALL {
            let outcome = statement.execute(params![
                key_value,
                class.as_str(),
                hazmat.get(class),
                truck_route.get(class),
                height.get(class),
                width.get(class),
                length.get(class),
                weight.get(class),
                axle_load.get(class),
            ]);
            report.record(&format_args!("{key} {class}"), outcome);
        }
    }
    Ok(report)
}
