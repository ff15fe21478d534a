//! Table layout of the statistics database.

use roadstats_core::RoadClass;
use rusqlite::Connection;

use super::PersistStatsError;
use super::spatial::SpatialBackend;

/// Geometry column holding each tile's bounding polygon.
pub const TILE_GEOMETRY_COLUMN: &str = "geom";

const CLASS_METRIC_COLUMNS: [(&str, &str); 4] = [
    ("oneway", "REAL"),
    ("maxspeed", "REAL"),
    ("internaledges", "INTEGER"),
    ("named", "REAL"),
];

const TRUCK_METRIC_COLUMNS: [(&str, &str); 7] = [
    ("hazmat", "REAL"),
    ("truck_route", "REAL"),
    ("height", "INTEGER"),
    ("width", "INTEGER"),
    ("length", "INTEGER"),
    ("weight", "INTEGER"),
    ("axle_load", "INTEGER"),
];

/// Names of the three tables written for one partition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionTables {
    /// Primary key column of the summary table.
    pub key_column: &'static str,
    key_type: &'static str,
    /// One row per key with per-class lengths.
    pub summary: &'static str,
    /// One row per key and road class with general attributes.
    pub classes: &'static str,
    /// One row per key and road class with truck restrictions.
    pub truck: &'static str,
}

/// Tables keyed by tile id.
pub const TILE_TABLES: PartitionTables = PartitionTables {
    key_column: "tileid",
    key_type: "INTEGER",
    summary: "tiledata",
    classes: "rclasstiledata",
    truck: "truckrclasstiledata",
};

/// Tables keyed by ISO country code.
pub const COUNTRY_TABLES: PartitionTables = PartitionTables {
    key_column: "isocode",
    key_type: "TEXT",
    summary: "countrydata",
    classes: "rclassctrydata",
    truck: "truckrclassctrydata",
};

/// Create all six statistics tables plus the spatial metadata.
pub(super) fn create_schema(
    connection: &Connection,
    spatial: &SpatialBackend,
) -> Result<(), PersistStatsError> {
    spatial
        .create_metadata(connection)
        .map_err(|source| PersistStatsError::Schema {
            step: "initialise spatial metadata",
            source,
        })?;

    run_schema_step(
        connection,
        "create tiledata",
        &summary_table(&TILE_TABLES, "tilearea REAL, totalroadlen REAL, "),
    )?;
    spatial.add_polygon_column(connection, TILE_TABLES.summary, TILE_GEOMETRY_COLUMN)?;
    run_schema_step(connection, "create rclasstiledata", &class_table(&TILE_TABLES))?;
    run_schema_step(
        connection,
        "create truckrclasstiledata",
        &truck_table(&TILE_TABLES),
    )?;

    run_schema_step(connection, "create countrydata", &summary_table(&COUNTRY_TABLES, ""))?;
    run_schema_step(connection, "create rclassctrydata", &class_table(&COUNTRY_TABLES))?;
    run_schema_step(
        connection,
        "create truckrclassctrydata",
        &truck_table(&COUNTRY_TABLES),
    )
}

fn run_schema_step(
    connection: &Connection,
    step: &'static str,
    sql: &str,
) -> Result<(), PersistStatsError> {
    connection
        .execute_batch(sql)
        .map_err(|source| PersistStatsError::Schema { step, source })
}

fn length_columns() -> String {
    RoadClass::ALL
        .iter()
        .map(|class| format!("{} REAL", class.column_name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn metric_columns(columns: &[(&str, &str)]) -> String {
    columns
        .iter()
        .map(|(name, sql_type)| format!("{name} {sql_type}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn summary_table(tables: &PartitionTables, extra_columns: &str) -> String {
    format!(
        "CREATE TABLE {table} ({key} {key_type} PRIMARY KEY, {extra_columns}{lengths})",
        table = tables.summary,
        key = tables.key_column,
        key_type = tables.key_type,
        lengths = length_columns(),
    )
}

fn per_class_table(tables: &PartitionTables, table: &str, columns: &[(&str, &str)]) -> String {
    format!(
        "CREATE TABLE {table} (
            {key} {key_type} NOT NULL REFERENCES {summary}({key}),
            type TEXT NOT NULL,
            {metrics}
        )",
        key = tables.key_column,
        key_type = tables.key_type,
        summary = tables.summary,
        metrics = metric_columns(columns),
    )
}

fn class_table(tables: &PartitionTables) -> String {
    per_class_table(tables, tables.classes, &CLASS_METRIC_COLUMNS)
}

fn truck_table(tables: &PartitionTables) -> String {
    per_class_table(tables, tables.truck, &TRUCK_METRIC_COLUMNS)
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_list(columns: &[(&str, &str)]) -> String {
    columns
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn length_column_list() -> String {
    RoadClass::ALL
        .iter()
        .map(|class| class.column_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT` for `tiledata`; the geometry is the last parameter.
pub(super) fn tile_summary_insert() -> String {
    let bound = 3 + RoadClass::COUNT;
    format!(
        "INSERT INTO {table} ({key}, tilearea, totalroadlen, {lengths}, {TILE_GEOMETRY_COLUMN})
            VALUES ({values}, GeomFromText(?{geometry}, {srid}))",
        table = TILE_TABLES.summary,
        key = TILE_TABLES.key_column,
        lengths = length_column_list(),
        values = placeholders(bound),
        geometry = bound + 1,
        srid = super::spatial::WGS84_SRID,
    )
}

/// `INSERT` for `countrydata`.
pub(super) fn country_summary_insert() -> String {
    format!(
        "INSERT INTO {table} ({key}, {lengths}) VALUES ({values})",
        table = COUNTRY_TABLES.summary,
        key = COUNTRY_TABLES.key_column,
        lengths = length_column_list(),
        values = placeholders(1 + RoadClass::COUNT),
    )
}

fn per_class_insert(tables: &PartitionTables, table: &str, columns: &[(&str, &str)]) -> String {
    format!(
        "INSERT INTO {table} ({key}, type, {metrics}) VALUES ({values})",
        key = tables.key_column,
        metrics = column_list(columns),
        values = placeholders(2 + columns.len()),
    )
}

/// `INSERT` for the general per-class table of `tables`.
pub(super) fn class_insert(tables: &PartitionTables) -> String {
    per_class_insert(tables, tables.classes, &CLASS_METRIC_COLUMNS)
}

/// `INSERT` for the truck per-class table of `tables`.
pub(super) fn truck_insert(tables: &PartitionTables) -> String {
    per_class_insert(tables, tables.truck, &TRUCK_METRIC_COLUMNS)
}
