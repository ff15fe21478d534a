//! Geometry support for the tile summary table.
//!
//! Two backends are offered. [`SpatialBackend::Builtin`] registers the few
//! geometry functions the statistics writer needs as plain SQLite scalar
//! functions, stores polygons as WKT text and indexes them with an R*Tree
//! virtual table. [`SpatialBackend::SpatiaLite`] loads the SpatiaLite
//! extension at runtime and defers to its own metadata and index routines.

use geo::{BoundingRect, Coord, LineString, Polygon, Rect};
use log::debug;
use rusqlite::{Connection, Error as SqliteError, functions::FunctionFlags};

use super::PersistStatsError;

/// Spatial reference identifier for WGS84 longitude/latitude.
pub const WGS84_SRID: i32 = 4326;

/// Name of the R*Tree table built over `tiledata.geom` by the builtin backend.
pub const TILE_INDEX_TABLE: &str = "idx_tiledata_geom";

/// Geometry engine used when writing the statistics database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpatialBackend {
    /// Scalar functions and an R*Tree index provided by the bundled SQLite.
    #[default]
    Builtin,
    /// The SpatiaLite extension, loaded from `module`.
    ///
    /// `module` is passed to SQLite unchanged, so either a bare library name
    /// such as `mod_spatialite` or a full path works.
    #[cfg(feature = "spatialite")]
    SpatiaLite {
        /// Shared library to load.
        module: String,
    },
}

impl SpatialBackend {
    /// Short label used in log messages.
    pub fn label(&self) -> &str {
        match self {
            Self::Builtin => "builtin",
            #[cfg(feature = "spatialite")]
            Self::SpatiaLite { module } => module.as_str(),
        }
    }

    /// Make the geometry functions available on `connection`.
    pub(crate) fn install(&self, connection: &Connection) -> Result<(), PersistStatsError> {
        match self {
            Self::Builtin => register_functions(connection).map_err(|source| {
                PersistStatsError::SpatialExtension {
                    module: self.label().to_owned(),
                    source,
                }
            }),
            #[cfg(feature = "spatialite")]
            Self::SpatiaLite { module } => spatialite::load(connection, module),
        }
    }

    /// Create the geometry metadata tables.
    pub(crate) fn create_metadata(&self, connection: &Connection) -> Result<(), SqliteError> {
        match self {
            Self::Builtin => connection.execute_batch(
                "CREATE TABLE IF NOT EXISTS geometry_columns (
                    f_table_name TEXT NOT NULL,
                    f_geometry_column TEXT NOT NULL,
                    geometry_type TEXT NOT NULL,
                    coord_dimension INTEGER NOT NULL,
                    srid INTEGER NOT NULL,
                    spatial_index_enabled INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (f_table_name, f_geometry_column)
                )",
            ),
            #[cfg(feature = "spatialite")]
            Self::SpatiaLite { .. } => spatialite::init_metadata(connection),
        }
    }

    /// Add a two-dimensional WGS84 polygon column to `table`.
    pub(crate) fn add_polygon_column(
        &self,
        connection: &Connection,
        table: &'static str,
        column: &'static str,
    ) -> Result<(), PersistStatsError> {
        match self {
            Self::Builtin => {
                let add_column = || -> Result<(), SqliteError> {
                    connection.execute_batch(&format!(
                        "ALTER TABLE {table} ADD COLUMN {column} POLYGON"
                    ))?;
                    connection.execute(
                        "INSERT INTO geometry_columns
                            (f_table_name, f_geometry_column, geometry_type, coord_dimension, srid)
                            VALUES (?1, ?2, 'POLYGON', 2, ?3)",
                        (table, column, WGS84_SRID),
                    )?;
                    Ok(())
                };
                add_column().map_err(|source| PersistStatsError::Schema {
                    step: "add geometry column",
                    source,
                })
            }
            #[cfg(feature = "spatialite")]
            Self::SpatiaLite { .. } => spatialite::add_geometry_column(connection, table, column),
        }
    }

    /// Build the spatial index over `table.column`.
    pub(crate) fn create_index(
        &self,
        connection: &Connection,
        table: &'static str,
        column: &'static str,
    ) -> Result<(), PersistStatsError> {
        match self {
            Self::Builtin => connection
                .execute_batch(&format!(
                    "BEGIN;
                    CREATE VIRTUAL TABLE {TILE_INDEX_TABLE} USING rtree(pkid, xmin, xmax, ymin, ymax);
                    INSERT INTO {TILE_INDEX_TABLE} (pkid, xmin, xmax, ymin, ymax)
                        SELECT rowid, MbrMinX({column}), MbrMaxX({column}),
                               MbrMinY({column}), MbrMaxY({column})
                        FROM {table} WHERE {column} IS NOT NULL;
                    UPDATE geometry_columns SET spatial_index_enabled = 1
                        WHERE f_table_name = '{table}' AND f_geometry_column = '{column}';
                    COMMIT;"
                ))
                .map_err(|source| {
                    // Leave the connection usable for the optimise step.
                    if let Err(rollback) = connection.execute_batch("ROLLBACK") {
                        debug!("no spatial index transaction to roll back: {rollback}");
                    }
                    PersistStatsError::Index { source }
                }),
            #[cfg(feature = "spatialite")]
            Self::SpatiaLite { .. } => spatialite::create_index(connection, table, column),
        }
    }
}

/// Render `bounds` as a closed WKT polygon.
///
/// The ring runs min/min, min/max, max/max, max/min and back to min/min.
///
/// # Examples
/// ```
/// use geo::{Coord, Rect};
/// use roadstats_data::statistics::polygon_wkt;
///
/// let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 2.0 });
/// assert_eq!(polygon_wkt(&bounds), "POLYGON((0 0, 0 2, 1 2, 1 0, 0 0))");
/// ```
pub fn polygon_wkt(bounds: &Rect<f64>) -> String {
    let min = bounds.min();
    let max = bounds.max();
    format!(
        "POLYGON(({x0} {y0}, {x0} {y1}, {x1} {y1}, {x1} {y0}, {x0} {y0}))",
        x0 = min.x,
        y0 = min.y,
        x1 = max.x,
        y1 = max.y,
    )
}

/// Parse the outer ring of a WKT polygon.
fn parse_polygon(wkt: &str) -> Option<Polygon<f64>> {
    let body = wkt.trim();
    let prefix = body.get(..7)?;
    if !prefix.eq_ignore_ascii_case("POLYGON") {
        return None;
    }
    let rings = body.get(7..)?.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (outer, _holes) = rings.trim().strip_prefix('(')?.split_once(')')?;
    let coords = outer
        .split(',')
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            Some(Coord { x, y })
        })
        .collect::<Option<Vec<_>>>()?;
    if coords.len() < 4 {
        return None;
    }
    Some(Polygon::new(LineString::from(coords), Vec::new()))
}

fn polygon_bounds(wkt: Option<String>) -> Option<Rect<f64>> {
    wkt.as_deref()
        .and_then(parse_polygon)
        .and_then(|polygon| polygon.bounding_rect())
}

fn register_functions(connection: &Connection) -> Result<(), SqliteError> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    connection.create_scalar_function("GeomFromText", 2, flags, |ctx| {
        let wkt: Option<String> = ctx.get(0)?;
        let _srid: Option<i64> = ctx.get(1)?;
        Ok(wkt.filter(|text| parse_polygon(text).is_some()))
    })?;

    let extents: [(&str, fn(&Rect<f64>) -> f64); 4] = [
        ("MbrMinX", |rect| rect.min().x),
        ("MbrMaxX", |rect| rect.max().x),
        ("MbrMinY", |rect| rect.min().y),
        ("MbrMaxY", |rect| rect.max().y),
    ];
    for (name, extent) in extents {
        connection.create_scalar_function(name, 1, flags, move |ctx| {
            let wkt: Option<String> = ctx.get(0)?;
            Ok(polygon_bounds(wkt).map(|rect| extent(&rect)))
        })?;
    }
    Ok(())
}

#[cfg(feature = "spatialite")]
mod spatialite {
    use rusqlite::{Connection, Error as SqliteError};

    use super::WGS84_SRID;
    use crate::statistics::PersistStatsError;

    #[expect(
        unsafe_code,
        reason = "SQLite extensions run arbitrary native code once loaded"
    )]
    pub(super) fn load(connection: &Connection, module: &str) -> Result<(), PersistStatsError> {
        let map_err = |source| PersistStatsError::SpatialExtension {
            module: module.to_owned(),
            source,
        };
        // SAFETY: the module is chosen by the operator running the tool and is
        // expected to be a genuine SpatiaLite build.
        unsafe {
            connection.load_extension_enable().map_err(map_err)?;
            let loaded = connection.load_extension(module, None::<&str>);
            let disabled = connection.load_extension_disable();
            loaded.map_err(map_err)?;
            disabled.map_err(map_err)
        }
    }

    pub(super) fn init_metadata(connection: &Connection) -> Result<(), SqliteError> {
        connection
            .query_row("SELECT InitSpatialMetaData(1)", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
    }

    pub(super) fn add_geometry_column(
        connection: &Connection,
        table: &'static str,
        column: &'static str,
    ) -> Result<(), PersistStatsError> {
        let status: i64 = connection
            .query_row(
                "SELECT AddGeometryColumn(?1, ?2, ?3, 'POLYGON', 2)",
                (table, column, WGS84_SRID),
                |row| row.get(0),
            )
            .map_err(|source| PersistStatsError::Schema {
                step: "add geometry column",
                source,
            })?;
        if status == 1 {
            Ok(())
        } else {
            Err(PersistStatsError::SpatialFunction {
                function: "AddGeometryColumn",
                table,
            })
        }
    }

    pub(super) fn create_index(
        connection: &Connection,
        table: &'static str,
        column: &'static str,
    ) -> Result<(), PersistStatsError> {
        let status: i64 = connection
            .query_row("SELECT CreateSpatialIndex(?1, ?2)", (table, column), |row| {
                row.get(0)
            })
            .map_err(|source| PersistStatsError::Index { source })?;
        if status == 1 {
            Ok(())
        } else {
            Err(PersistStatsError::SpatialFunction {
                function: "CreateSpatialIndex",
                table,
            })
        }
    }
}
