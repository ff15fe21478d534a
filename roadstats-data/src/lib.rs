//! Persistence and export for merged road statistics.
//!
//! Responsibilities:
//! - Write merged metrics to a SQLite database with a spatially indexed
//!   tile geometry column ([`statistics`]).
//! - Export review tasks as a JSON document ([`tasks`]).
//! - Load and save worker snapshots ([`snapshot`]).
//! - Drive both outputs from one configuration ([`mod@publish`]).
//!
//! Boundaries:
//! - Accumulation and merge rules live in `roadstats-core`.
//! - Writes are synchronous and local; nothing here blocks on the network.
#![deny(unsafe_code)]

pub mod publish;
pub mod snapshot;
pub mod statistics;
pub mod tasks;

pub use publish::{PublishConfig, PublishOutcome, publish};
pub use snapshot::{SnapshotError, load_and_merge, load_snapshot, save_snapshot};
pub use statistics::{
    PersistReport, PersistStatsError, PersistStep, SpatialBackend, TableReport, persist_statistics,
};
pub use tasks::{ExportTasksError, export_tasks, render_tasks};
