//! JSON export of ways flagged for manual review.
//!
//! Each task becomes one object holding a GeoJSON feature collection with
//! the way's representative point and its full shape, the way id as a
//! string identifier, and the reviewer instruction.

use camino::{Utf8Path, Utf8PathBuf};
use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use log::info;
use roadstats_core::{REVIEW_INSTRUCTION, ReviewCollector, ReviewTask, WayId};
use roadstats_fs::replace_file;
use serde::Serialize;
use thiserror::Error;

/// Errors raised when exporting review tasks.
#[derive(Debug, Error)]
pub enum ExportTasksError {
    /// Encoding the task document failed.
    #[error("failed to serialise review tasks")]
    Serialise {
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the task file failed.
    #[error("failed to write review tasks to {path:?}")]
    Write {
        /// Destination file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize)]
struct TaskDocument {
    geometries: FeatureCollection,
    identifier: String,
    instruction: &'static str,
}

fn feature(value: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

impl TaskDocument {
    fn new(way_id: WayId, task: &ReviewTask) -> Self {
        let location = Point::from(task.location);
        let shape = LineString::new(task.shape.clone());
        let mut way = JsonObject::new();
        way.insert("osmid".to_owned(), way_id.into());

        Self {
            geometries: FeatureCollection {
                bbox: None,
                features: vec![
                    feature(geojson::Value::from(&location), JsonObject::new()),
                    feature(geojson::Value::from(&shape), way),
                ],
                foreign_members: None,
            },
            identifier: way_id.to_string(),
            instruction: REVIEW_INSTRUCTION,
        }
    }
}

/// Render every task in `review` as a JSON array, ordered by way id.
///
/// # Errors
///
/// Returns [`ExportTasksError::Serialise`] when encoding fails.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use roadstats_core::ReviewCollector;
/// use roadstats_data::tasks::render_tasks;
///
/// let mut review = ReviewCollector::default();
/// let start = Coord { x: 1.0, y: 2.0 };
/// review.add_task(555, start, vec![start, Coord { x: 1.5, y: 2.5 }]);
///
/// let json = render_tasks(&review).expect("render tasks");
/// assert!(json.contains(r#""identifier":"555""#));
/// ```
pub fn render_tasks(review: &ReviewCollector) -> Result<String, ExportTasksError> {
    let documents: Vec<TaskDocument> = review
        .iter()
        .map(|(way_id, task)| TaskDocument::new(way_id, task))
        .collect();
    serde_json::to_string(&documents).map_err(|source| ExportTasksError::Serialise { source })
}

/// Write the review tasks to `path`, replacing any existing file.
///
/// Missing parent directories are created. Returns the number of tasks
/// written.
///
/// # Errors
///
/// Returns [`ExportTasksError`] when encoding or writing fails.
pub fn export_tasks(path: &Utf8Path, review: &ReviewCollector) -> Result<usize, ExportTasksError> {
    let mut contents = render_tasks(review)?;
    contents.push('\n');
    replace_file(path, contents.as_bytes()).map_err(|source| ExportTasksError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported {} review tasks to {path}", review.len());
    Ok(review.len())
}
