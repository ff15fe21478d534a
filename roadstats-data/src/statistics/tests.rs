//! Unit tests for the statistics database writer.


use super::*;
use camino::Utf8PathBuf;
use roadstats_core::test_support::{store_with_countries, store_with_tiles};
use roadstats_core::{Merge, RoadClass};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn db_path(&self) -> Utf8PathBuf {
        self.root.join("stats.db")
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    Workspace { _dir: dir, root }
}

fn open(path: &Utf8Path) -> Connection {
    Connection::open(path.as_std_path()).expect("open written database")
}

fn count_rows(connection: &Connection, table: &str) -> i64 {
    connection
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap_or_else(|err| panic!("count rows in {table}: {err}"))
}

#[rstest]
fn writes_one_summary_row_and_eight_class_rows_per_tile(
    workspace: Workspace,
) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    let report = persist_statistics(&path, &store_with_tiles(&[7, 42]), &SpatialBackend::Builtin)?;

    let connection = open(&path);
    assert_eq!(count_rows(&connection, "tiledata"), 2);
    assert_eq!(count_rows(&connection, "rclasstiledata"), 16);
    assert_eq!(count_rows(&connection, "truckrclasstiledata"), 16);
    assert_eq!(count_rows(&connection, "countrydata"), 0);
    assert_eq!(report.table("rclasstiledata").map(|t| t.rows_written), Some(16));
    assert_eq!(report.rows_written(), 34);
    assert_eq!(report.rows_failed(), 0);
    assert!(report.indexed());
    assert!(report.optimised());
    Ok(())
}

#[rstest]
fn summary_rows_carry_per_class_lengths(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    persist_statistics(&path, &store_with_tiles(&[7]), &SpatialBackend::Builtin)?;

    let connection = open(&path);
    let (area, total, motorway, pmary, residential): (f64, f64, f64, f64, f64) = connection
        .query_row(
            "SELECT tilearea, totalroadlen, motorway, pmary, residential FROM tiledata WHERE tileid = 7",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .expect("read tile 7");
    assert_eq!((area, total), (12.5, 12.5));
    assert_eq!((motorway, pmary, residential), (10.0, 0.0, 2.5));
    Ok(())
}

#[rstest]
fn class_rows_follow_road_class_order(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    persist_statistics(&path, &store_with_tiles(&[7]), &SpatialBackend::Builtin)?;

    let connection = open(&path);
    let mut statement = connection
        .prepare("SELECT type, oneway, internaledges FROM rclasstiledata WHERE tileid = 7 ORDER BY rowid")
        .expect("prepare select");
    let rows: Vec<(String, f64, i64)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .expect("query class rows")
        .collect::<Result<_, _>>()
        .expect("collect class rows");

    let labels: Vec<&str> = rows.iter().map(|(label, _, _)| label.as_str()).collect();
    let expected: Vec<&str> = RoadClass::ALL.iter().map(|class| class.as_str()).collect();
    assert_eq!(labels, expected);
    assert_eq!(rows.first().map(|row| row.1), Some(10.0), "motorway one-way length");
    assert_eq!(rows.get(6).map(|row| row.2), Some(1), "residential internal edges");
    Ok(())
}

#[rstest]
fn tiles_are_written_in_ascending_order(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    persist_statistics(&path, &store_with_tiles(&[42, 7, 19]), &SpatialBackend::Builtin)?;

    let connection = open(&path);
    let mut statement = connection
        .prepare("SELECT DISTINCT tileid FROM truckrclasstiledata ORDER BY rowid")
        .expect("prepare select");
    let ids: Vec<i64> = statement
        .query_map([], |row| row.get(0))
        .expect("query tile ids")
        .collect::<Result<_, _>>()
        .expect("collect tile ids");
    assert_eq!(ids, vec![7, 19, 42]);
    Ok(())
}

#[rstest]
fn country_tables_are_keyed_by_iso_code(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    let stats = store_with_countries(&["FR", "DE"]).merge(store_with_tiles(&[1]));
    let report = persist_statistics(&path, &stats, &SpatialBackend::Builtin)?;

    let connection = open(&path);
    assert_eq!(count_rows(&connection, "countrydata"), 2);
    assert_eq!(count_rows(&connection, "rclassctrydata"), 16);
    let (hazmat, weight): (f64, i64) = connection
        .query_row(
            "SELECT hazmat, weight FROM truckrclassctrydata WHERE isocode = 'DE' AND type = 'Motorway'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("read DE motorway truck row");
    assert_eq!((hazmat, weight), (40.0, 0));
    let trunk_weight: i64 = connection
        .query_row(
            "SELECT weight FROM truckrclassctrydata WHERE isocode = 'FR' AND type = 'Trunk'",
            [],
            |row| row.get(0),
        )
        .expect("read FR trunk truck row");
    assert_eq!(trunk_weight, 2);
    assert_eq!(report.table("truckrclassctrydata").map(|t| t.rows_written), Some(16));
    Ok(())
}

#[rstest]
fn missing_geometry_is_stored_as_null(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    let mut stats = store_with_tiles(&[7]);
    stats.add_tile_road(8, RoadClass::Trunk, 3.0);

    let report = persist_statistics(&path, &stats, &SpatialBackend::Builtin)?;

    let connection = open(&path);
    let geometry: Option<String> = connection
        .query_row("SELECT geom FROM tiledata WHERE tileid = 8", [], |row| row.get(0))
        .expect("tile 8 row exists");
    assert!(geometry.is_none());
    assert_eq!(report.tiles_missing_geometry, 1);
    assert_eq!(count_rows(&connection, "tiledata"), 2);
    assert_eq!(count_rows(&connection, TILE_INDEX_TABLE), 1);
    Ok(())
}

#[rstest]
fn geometry_is_indexed(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    persist_statistics(&path, &store_with_tiles(&[7, 42]), &SpatialBackend::Builtin)?;

    let connection = open(&path);
    let hit: i64 = connection
        .query_row(
            &format!(
                "SELECT pkid FROM {TILE_INDEX_TABLE}
                    WHERE xmin <= 1.5 AND xmax >= 1.5 AND ymin <= 1.5 AND ymax >= 1.5"
            ),
            [],
            |row| row.get(0),
        )
        .expect("query spatial index");
    assert_eq!(hit, 42);

    let (srid, enabled): (i64, i64) = connection
        .query_row(
            "SELECT srid, spatial_index_enabled FROM geometry_columns
                WHERE f_table_name = 'tiledata' AND f_geometry_column = 'geom'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("read geometry metadata");
    assert_eq!((srid, enabled), (i64::from(WGS84_SRID), 1));
    Ok(())
}

#[rstest]
fn replaces_existing_file(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    std::fs::write(path.as_std_path(), b"not a database").expect("seed stale file");

    persist_statistics(&path, &store_with_tiles(&[3]), &SpatialBackend::Builtin)?;

    assert_eq!(count_rows(&open(&path), "tiledata"), 1);
    Ok(())
}

#[rstest]
fn second_run_starts_from_scratch(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    persist_statistics(&path, &store_with_tiles(&[1, 2, 3]), &SpatialBackend::Builtin)?;
    persist_statistics(&path, &store_with_tiles(&[9]), &SpatialBackend::Builtin)?;

    assert_eq!(count_rows(&open(&path), "tiledata"), 1);
    Ok(())
}

#[rstest]
fn creates_missing_parent_directories(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.root.join("nested/output/stats.db");
    persist_statistics(&path, &store_with_tiles(&[3]), &SpatialBackend::Builtin)?;
    assert!(path.as_std_path().is_file());
    Ok(())
}

#[rstest]
fn empty_store_still_creates_schema(workspace: Workspace) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    let report = persist_statistics(&path, &MetricStore::default(), &SpatialBackend::Builtin)?;

    let connection = open(&path);
    for table in [
        "tiledata",
        "rclasstiledata",
        "truckrclasstiledata",
        "countrydata",
        "rclassctrydata",
        "truckrclassctrydata",
    ] {
        assert_eq!(count_rows(&connection, table), 0, "{table} should be empty");
    }
    assert_eq!(report.tables.len(), 6);
    Ok(())
}

#[rstest]
fn refuses_to_replace_a_directory(workspace: Workspace) {
    let path = workspace.db_path();
    std::fs::create_dir(path.as_std_path()).expect("create blocking directory");

    let err = persist_statistics(&path, &store_with_tiles(&[3]), &SpatialBackend::Builtin)
        .expect_err("directory destinations are rejected");
    match err {
        PersistStatsError::RemoveExisting { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected remove error, got {other:?}"),
    }
}

#[rstest]
fn steps_run_in_pipeline_order() {
    let names: Vec<_> = PersistStep::ALL.iter().map(|step| step.name()).collect();
    assert_eq!(
        names,
        vec![
            "create schema",
            "insert summaries",
            "insert per-class metrics",
            "insert truck metrics",
            "build spatial index",
            "optimise",
        ]
    );
    let best_effort: Vec<_> = PersistStep::ALL
        .into_iter()
        .filter(|step| step.is_best_effort())
        .collect();
    assert_eq!(best_effort, vec![PersistStep::BuildIndex, PersistStep::Optimise]);
}

#[rstest]
fn failed_rows_are_counted_and_the_table_still_commits(
    workspace: Workspace,
) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    let stats = store_with_tiles(&[3, 4]);
    let spatial = SpatialBackend::Builtin;
    let mut writer = StatisticsWriter::open(&path, &stats, &spatial)?;
    writer.run(PersistStep::CreateSchema)?;
    write_table(&mut writer.connection, TILE_TABLES.summary, |tx| {
        rows::insert_tile_summaries(tx, &stats, &[4]).map(|(report, _)| report)
    })?;

    // Tile 3 has no summary row, so its class rows break the foreign key.
    let report = write_table(&mut writer.connection, TILE_TABLES.classes, |tx| {
        rows::insert_class_rows(tx, &TILE_TABLES, stats.tiles(), &[3, 4])
    })?;
    drop(writer);

    assert_eq!(report.rows_failed, 8);
    assert_eq!(report.rows_written, 8, "rows after a failure are still written");
    let connection = open(&path);
    assert_eq!(count_rows(&connection, "rclasstiledata"), 8);
    let orphaned: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM rclasstiledata WHERE tileid = 3",
            [],
            |row| row.get(0),
        )
        .expect("count rows for tile 3");
    assert_eq!(orphaned, 0);
    Ok(())
}

#[rstest]
fn index_failure_is_recorded_and_the_run_completes(
    workspace: Workspace,
) -> Result<(), PersistStatsError> {
    let path = workspace.db_path();
    let stats = store_with_tiles(&[7]);
    let spatial = SpatialBackend::Builtin;
    let writer = StatisticsWriter::open(&path, &stats, &spatial)?;
    writer
        .connection
        .execute_batch(&format!("CREATE TABLE {TILE_INDEX_TABLE} (pkid INTEGER)"))
        .expect("occupy the index table name");

    let report = writer.run_all()?;

    assert!(!report.indexed());
    assert!(report.optimised());
    assert_eq!(report.failed_steps, vec![PersistStep::BuildIndex]);
    assert_eq!(report.rows_written(), 17);
    let connection = open(&path);
    assert_eq!(count_rows(&connection, "tiledata"), 1);
    assert_eq!(count_rows(&connection, TILE_INDEX_TABLE), 0);
    Ok(())
}
