//! Facade crate for the road network statistics toolkit.
//!
//! This crate re-exports the accumulation and merge types and, behind the
//! `store-sqlite` feature, the SQLite persistence and task export.

#![forbid(unsafe_code)]

pub use roadstats_core::{
    ClassTotals, CountryCode, Merge, MetricMap, MetricStore, PartitionMetrics, REVIEW_INSTRUCTION,
    ReviewCategory, ReviewCollector, ReviewTask, RoadClass, TileId, WayId, WorkerSnapshot,
    merge_all,
};

#[cfg(feature = "store-sqlite")]
pub use roadstats_data::{
    ExportTasksError, PersistReport, PersistStatsError, PublishConfig, PublishOutcome,
    SnapshotError, SpatialBackend, export_tasks, load_and_merge, load_snapshot,
    persist_statistics, publish, save_snapshot,
};
