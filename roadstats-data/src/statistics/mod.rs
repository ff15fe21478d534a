//! SQLite persistence for merged road statistics.
//!
//! The writer produces a fresh database with six tables: a summary, a
//! general per-class table and a truck per-class table for each of the tile
//! and country partitions. Tile rows carry a bounding polygon that is
//! spatially indexed once all rows are in.
//!
//! Writing is a fixed pipeline of [`PersistStep`]s. Schema and insert steps
//! stop the pipeline on failure. Indexing and optimisation are best-effort:
//! their failures are logged and recorded in the [`PersistReport`].

mod rows;
mod schema;
mod spatial;

use camino::{Utf8Path, Utf8PathBuf};
use log::{error, info, warn};
use roadstats_core::{CountryCode, MetricStore, TileId};
use roadstats_fs::{ensure_parent_dir, remove_file_if_exists};
use rusqlite::{Connection, Error as SqliteError, Transaction};
use thiserror::Error;

pub use schema::{COUNTRY_TABLES, PartitionTables, TILE_GEOMETRY_COLUMN, TILE_TABLES};
pub use spatial::{SpatialBackend, TILE_INDEX_TABLE, WGS84_SRID, polygon_wkt};

/// Errors raised when writing the statistics database.
#[derive(Debug, Error)]
pub enum PersistStatsError {
    /// Failed to create the parent directory for the database.
    #[error("failed to create parent directory for {path:?}")]
    CreateDirectory {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Removing a previous database at the destination failed.
    #[error("failed to remove existing database at {path:?}")]
    RemoveExisting {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Enabling SQLite foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The geometry functions could not be made available.
    #[error("failed to install spatial support from {module}")]
    SpatialExtension {
        /// Backend label or extension module.
        module: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A spatial management function reported failure without raising.
    #[error("{function} failed for table {table}")]
    SpatialFunction {
        /// Function that returned a failure status.
        function: &'static str,
        /// Table it was applied to.
        table: &'static str,
    },
    /// A schema statement failed.
    #[error("schema step failed: {step}")]
    Schema {
        /// Description of the failing step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning a table transaction failed.
    #[error("failed to begin transaction for {table}")]
    BeginTransaction {
        /// Table being written.
        table: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Preparing an insert statement failed.
    #[error("failed to prepare insert statement for {table}")]
    PrepareInsert {
        /// Table being written.
        table: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing a table transaction failed.
    #[error("failed to commit transaction for {table}")]
    Commit {
        /// Table being written.
        table: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Building the spatial index failed.
    #[error("failed to build spatial index")]
    Index {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// `VACUUM` or `ANALYZE` failed.
    #[error("{command} failed")]
    Optimise {
        /// Maintenance command that failed.
        command: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Stages of writing the statistics database, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStep {
    /// Create tables and spatial metadata.
    CreateSchema,
    /// Fill `tiledata` and `countrydata`.
    InsertSummaries,
    /// Fill `rclasstiledata` and `rclassctrydata`.
    InsertClassMetrics,
    /// Fill `truckrclasstiledata` and `truckrclassctrydata`.
    InsertTruckMetrics,
    /// Index tile geometries.
    BuildIndex,
    /// `VACUUM` then `ANALYZE`.
    Optimise,
}

impl PersistStep {
    /// Every step in execution order.
    pub const ALL: [Self; 6] = [
        Self::CreateSchema,
        Self::InsertSummaries,
        Self::InsertClassMetrics,
        Self::InsertTruckMetrics,
        Self::BuildIndex,
        Self::Optimise,
    ];

    /// Human-readable name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateSchema => "create schema",
            Self::InsertSummaries => "insert summaries",
            Self::InsertClassMetrics => "insert per-class metrics",
            Self::InsertTruckMetrics => "insert truck metrics",
            Self::BuildIndex => "build spatial index",
            Self::Optimise => "optimise",
        }
    }

    /// Whether a failure of this step lets the pipeline continue.
    pub const fn is_best_effort(self) -> bool {
        matches!(self, Self::BuildIndex | Self::Optimise)
    }
}

/// Row counts for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    /// Table name.
    pub table: &'static str,
    /// Rows inserted successfully.
    pub rows_written: usize,
    /// Rows whose insert failed.
    pub rows_failed: usize,
}

impl TableReport {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            rows_written: 0,
            rows_failed: 0,
        }
    }
}

/// Outcome of a completed persist run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistReport {
    /// Per-table row counts in write order.
    pub tables: Vec<TableReport>,
    /// Tiles written with a `NULL` geometry.
    pub tiles_missing_geometry: usize,
    /// Best-effort steps that failed.
    pub failed_steps: Vec<PersistStep>,
}

impl PersistReport {
    /// Counts for `table`, if it was written.
    pub fn table(&self, table: &str) -> Option<&TableReport> {
        self.tables.iter().find(|report| report.table == table)
    }

    /// Rows written across all tables.
    pub fn rows_written(&self) -> usize {
        self.tables.iter().map(|report| report.rows_written).sum()
    }

    /// Rows that failed across all tables.
    pub fn rows_failed(&self) -> usize {
        self.tables.iter().map(|report| report.rows_failed).sum()
    }

    /// Whether the spatial index was built.
    pub fn indexed(&self) -> bool {
        !self.failed_steps.contains(&PersistStep::BuildIndex)
    }

    /// Whether `VACUUM` and `ANALYZE` both ran.
    pub fn optimised(&self) -> bool {
        !self.failed_steps.contains(&PersistStep::Optimise)
    }
}

/// Write `stats` to a new SQLite database at `path`.
///
/// Any file already at `path` is deleted first and missing parent
/// directories are created. Keys are written in ascending order, and every
/// per-class table receives one row per key and road class.
///
/// # Errors
///
/// Returns [`PersistStatsError`] when the database cannot be created, the
/// schema cannot be built or a table transaction cannot be prepared or
/// committed. Failed individual rows and best-effort steps are logged and
/// counted in the report instead.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use roadstats_core::{MetricStore, RoadClass};
/// use roadstats_data::statistics::{SpatialBackend, persist_statistics};
///
/// # fn main() -> Result<(), roadstats_data::statistics::PersistStatsError> {
/// let mut stats = MetricStore::default();
/// stats.add_tile_road(7, RoadClass::Motorway, 1200.0);
/// let report = persist_statistics(
///     Utf8Path::new("out/stats.db"),
///     &stats,
///     &SpatialBackend::default(),
/// )?;
/// assert_eq!(report.rows_failed(), 0);
/// # Ok(())
/// # }
/// ```
pub fn persist_statistics(
    path: &Utf8Path,
    stats: &MetricStore,
    spatial: &SpatialBackend,
) -> Result<PersistReport, PersistStatsError> {
    info!(
        "Writing statistics database to {path} using {} spatial support",
        spatial.label()
    );
    let report = StatisticsWriter::open(path, stats, spatial)?.run_all()?;
    info!(
        "Finished writing {path}: {} rows written, {} failed, {} tiles without geometry",
        report.rows_written(),
        report.rows_failed(),
        report.tiles_missing_geometry,
    );
    Ok(report)
}

struct StatisticsWriter<'a> {
    connection: Connection,
    stats: &'a MetricStore,
    spatial: &'a SpatialBackend,
    tile_ids: Vec<TileId>,
    country_codes: Vec<CountryCode>,
    report: PersistReport,
}

impl<'a> StatisticsWriter<'a> {
    fn open(
        path: &Utf8Path,
        stats: &'a MetricStore,
        spatial: &'a SpatialBackend,
    ) -> Result<Self, PersistStatsError> {
        ensure_parent_dir(path).map_err(|source| PersistStatsError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let replaced =
            remove_file_if_exists(path).map_err(|source| PersistStatsError::RemoveExisting {
                path: path.to_path_buf(),
                source,
            })?;
        if replaced {
            info!("Replaced existing statistics database at {path}");
        }

        let connection =
            Connection::open(path.as_std_path()).map_err(|source| PersistStatsError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| PersistStatsError::ForeignKeys { source })?;
        spatial.install(&connection)?;

        Ok(Self {
            connection,
            stats,
            spatial,
            tile_ids: stats.sorted_tile_ids(),
            country_codes: stats.sorted_country_codes(),
            report: PersistReport::default(),
        })
    }

    fn run_all(mut self) -> Result<PersistReport, PersistStatsError> {
        for step in PersistStep::ALL {
            match self.run(step) {
                Ok(()) => {}
                Err(err) if step.is_best_effort() => {
                    warn!("Statistics step '{}' failed: {err}", step.name());
                    self.report.failed_steps.push(step);
                }
                Err(err) => {
                    error!("Statistics step '{}' failed: {err}", step.name());
                    return Err(err);
                }
            }
        }
        Ok(self.report)
    }

    fn run(&mut self, step: PersistStep) -> Result<(), PersistStatsError> {
        match step {
            PersistStep::CreateSchema => schema::create_schema(&self.connection, self.spatial),
            PersistStep::InsertSummaries => self.insert_summaries(),
            PersistStep::InsertClassMetrics => self.insert_class_metrics(),
            PersistStep::InsertTruckMetrics => self.insert_truck_metrics(),
            PersistStep::BuildIndex => self.spatial.create_index(
                &self.connection,
                TILE_TABLES.summary,
                TILE_GEOMETRY_COLUMN,
            ),
            PersistStep::Optimise => self.optimise(),
        }
    }

    fn insert_summaries(&mut self) -> Result<(), PersistStatsError> {
        let (stats, tile_ids) = (self.stats, &self.tile_ids);
        let mut missing = 0;
        let tiles = write_table(&mut self.connection, TILE_TABLES.summary, |tx| {
            let (report, missing_geometry) = rows::insert_tile_summaries(tx, stats, tile_ids)?;
            missing = missing_geometry;
            Ok(report)
        })?;
        self.report.tables.push(tiles);
        self.report.tiles_missing_geometry = missing;

        let codes = &self.country_codes;
        let countries = write_table(&mut self.connection, COUNTRY_TABLES.summary, |tx| {
            rows::insert_country_summaries(tx, stats, codes)
        })?;
        self.report.tables.push(countries);
        Ok(())
    }

    fn insert_class_metrics(&mut self) -> Result<(), PersistStatsError> {
        let (stats, tile_ids, codes) = (self.stats, &self.tile_ids, &self.country_codes);
        let tiles = write_table(&mut self.connection, TILE_TABLES.classes, |tx| {
            rows::insert_class_rows(tx, &TILE_TABLES, stats.tiles(), tile_ids)
        })?;
        self.report.tables.push(tiles);
        let countries = write_table(&mut self.connection, COUNTRY_TABLES.classes, |tx| {
            rows::insert_class_rows(tx, &COUNTRY_TABLES, stats.countries(), codes)
        })?;
        self.report.tables.push(countries);
        Ok(())
    }

    fn insert_truck_metrics(&mut self) -> Result<(), PersistStatsError> {
        let (stats, tile_ids, codes) = (self.stats, &self.tile_ids, &self.country_codes);
        let tiles = write_table(&mut self.connection, TILE_TABLES.truck, |tx| {
            rows::insert_truck_rows(tx, &TILE_TABLES, stats.tiles(), tile_ids)
        })?;
        self.report.tables.push(tiles);
        let countries = write_table(&mut self.connection, COUNTRY_TABLES.truck, |tx| {
            rows::insert_truck_rows(tx, &COUNTRY_TABLES, stats.countries(), codes)
        })?;
        self.report.tables.push(countries);
        Ok(())
    }

    fn optimise(&self) -> Result<(), PersistStatsError> {
        for command in ["VACUUM", "ANALYZE"] {
            self.connection
                .execute_batch(command)
                .map_err(|source| PersistStatsError::Optimise { command, source })?;
        }
        Ok(())
    }
}

/// Fill `table` inside its own transaction.
fn write_table<F>(
    connection: &mut Connection,
    table: &'static str,
    fill: F,
) -> Result<TableReport, PersistStatsError>
where
    F: FnOnce(&Transaction<'_>) -> Result<TableReport, PersistStatsError>,
{
    let transaction = connection
        .transaction()
        .map_err(|source| PersistStatsError::BeginTransaction { table, source })?;
    let report = fill(&transaction)?;
    transaction
        .commit()
        .map_err(|source| PersistStatsError::Commit { table, source })?;
    if report.rows_failed > 0 {
        warn!(
            "{table}: {} rows written, {} failed",
            report.rows_written, report.rows_failed
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests;
