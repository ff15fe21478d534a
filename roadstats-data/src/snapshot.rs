//! Reading and writing worker snapshots as JSON files.

use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use roadstats_core::{WorkerSnapshot, merge_all};
use roadstats_fs::{open_utf8_file, replace_file};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when loading or saving a worker snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be opened.
    #[error("failed to open snapshot {path:?}")]
    Open {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not a valid snapshot document.
    #[error("failed to parse snapshot {path:?}")]
    Parse {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Encoding the snapshot failed.
    #[error("failed to serialise snapshot for {path:?}")]
    Serialise {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// The snapshot holds a NaN or infinite value, which JSON cannot carry.
    #[error("snapshot for {path:?} holds a non-finite number at {pointer}")]
    NonFinite {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// JSON pointer to the offending value.
        pointer: String,
    },
    /// Writing the snapshot file failed.
    #[error("failed to write snapshot {path:?}")]
    Write {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Load one worker snapshot from a JSON file.
///
/// # Errors
///
/// Returns [`SnapshotError::Open`] or [`SnapshotError::Parse`].
pub fn load_snapshot(path: &Utf8Path) -> Result<WorkerSnapshot, SnapshotError> {
    let file = open_utf8_file(path).map_err(|source| SnapshotError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every snapshot in `paths` and fold them left to right.
///
/// Earlier files win when two snapshots report the same tile, country or
/// way.
///
/// # Errors
///
/// Stops at the first snapshot that cannot be loaded.
pub fn load_and_merge<P: AsRef<Utf8Path>>(paths: &[P]) -> Result<WorkerSnapshot, SnapshotError> {
    let snapshots = paths
        .iter()
        .map(|path| load_snapshot(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Merging {} worker snapshots", snapshots.len());
    Ok(merge_all(snapshots))
}

/// Write `snapshot` to `path` as JSON, replacing any existing file.
///
/// # Errors
///
/// Returns [`SnapshotError::NonFinite`] when a metric or coordinate is NaN
/// or infinite, otherwise [`SnapshotError::Serialise`] or
/// [`SnapshotError::Write`].
pub fn save_snapshot(path: &Utf8Path, snapshot: &WorkerSnapshot) -> Result<(), SnapshotError> {
    let serialise_error = |source| SnapshotError::Serialise {
        path: path.to_path_buf(),
        source,
    };
    let document = serde_json::to_value(snapshot).map_err(serialise_error)?;
    // Snapshots carry no optional fields, so `null` only stands in for a
    // non-finite float.
    if let Some(pointer) = first_null(&document, "") {
        return Err(SnapshotError::NonFinite {
            path: path.to_path_buf(),
            pointer,
        });
    }
    let encoded = serde_json::to_vec(&document).map_err(serialise_error)?;
    replace_file(path, &encoded).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn first_null(value: &Value, pointer: &str) -> Option<String> {
    match value {
        Value::Null => Some(pointer.to_owned()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, item)| first_null(item, &format!("{pointer}/{index}"))),
        Value::Object(fields) => fields
            .iter()
            .find_map(|(key, item)| first_null(item, &format!("{pointer}/{key}"))),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}
