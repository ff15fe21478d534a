//! Writing the merged results of a run to their configured destinations.

use camino::Utf8PathBuf;
use log::{error, info};
use roadstats_core::WorkerSnapshot;

use crate::statistics::{PersistReport, SpatialBackend, persist_statistics};
use crate::tasks::export_tasks;

/// Destinations for the merged statistics and review tasks.
///
/// A `None` destination skips that output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishConfig {
    /// Path of the statistics database.
    pub statistics: Option<Utf8PathBuf>,
    /// Path of the review task JSON file.
    pub tasks: Option<Utf8PathBuf>,
    /// Geometry engine used for the statistics database.
    pub spatial: SpatialBackend,
}

/// What a [`publish`] call managed to write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishOutcome {
    /// Report of the statistics database, if one was written.
    pub statistics: Option<PersistReport>,
    /// Number of exported review tasks, if the task file was written.
    pub tasks_exported: Option<usize>,
    /// Outputs that were configured but failed.
    pub failures: usize,
}

impl PublishOutcome {
    /// Whether every configured output was written.
    pub fn is_complete(&self) -> bool {
        self.failures == 0
    }
}

/// Persist the statistics and export the review tasks of `snapshot`.
///
/// Failures are logged and counted rather than returned, so one failing
/// output never prevents the other from being written.
pub fn publish(config: &PublishConfig, snapshot: &WorkerSnapshot) -> PublishOutcome {
    let mut outcome = PublishOutcome::default();

    match config.statistics.as_deref() {
        Some(path) => match persist_statistics(path, &snapshot.metrics, &config.spatial) {
            Ok(report) => outcome.statistics = Some(report),
            Err(err) => {
                error!("Failed to write statistics database {path}: {err}");
                outcome.failures += 1;
            }
        },
        None => info!("No statistics database configured, skipping persistence"),
    }

    match config.tasks.as_deref() {
        Some(path) => match export_tasks(path, &snapshot.review) {
            Ok(count) => outcome.tasks_exported = Some(count),
            Err(err) => {
                error!("Failed to export review tasks to {path}: {err}");
                outcome.failures += 1;
            }
        },
        None => info!("No task file configured, skipping review export"),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadstats_core::test_support::{collector_with_ways, store_with_tiles};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn out_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        (dir, root)
    }

    #[fixture]
    fn snapshot() -> WorkerSnapshot {
        WorkerSnapshot {
            metrics: store_with_tiles(&[7, 42]),
            review: collector_with_ways(&[555]),
        }
    }

    #[rstest]
    fn unconfigured_outputs_are_skipped(snapshot: WorkerSnapshot) {
        let outcome = publish(&PublishConfig::default(), &snapshot);
        assert_eq!(outcome, PublishOutcome::default());
        assert!(outcome.is_complete());
    }

    #[rstest]
    fn writes_both_outputs(out_dir: (TempDir, Utf8PathBuf), snapshot: WorkerSnapshot) {
        let (_guard, root) = out_dir;
        let config = PublishConfig {
            statistics: Some(root.join("stats.db")),
            tasks: Some(root.join("tasks.json")),
            spatial: SpatialBackend::Builtin,
        };

        let outcome = publish(&config, &snapshot);

        assert!(outcome.is_complete());
        assert_eq!(outcome.tasks_exported, Some(1));
        let report = outcome.statistics.expect("statistics written");
        assert_eq!(report.table("tiledata").map(|t| t.rows_written), Some(2));
        assert!(root.join("tasks.json").as_std_path().is_file());
    }

    #[rstest]
    fn a_failing_output_does_not_block_the_other(
        out_dir: (TempDir, Utf8PathBuf),
        snapshot: WorkerSnapshot,
    ) {
        let (_guard, root) = out_dir;
        let blocked = root.join("stats.db");
        std::fs::create_dir(blocked.as_std_path()).expect("create blocking directory");
        let config = PublishConfig {
            statistics: Some(blocked),
            tasks: Some(root.join("tasks.json")),
            spatial: SpatialBackend::Builtin,
        };

        let outcome = publish(&config, &snapshot);

        assert_eq!(outcome.failures, 1);
        assert!(outcome.statistics.is_none());
        assert_eq!(outcome.tasks_exported, Some(1));
    }
}
