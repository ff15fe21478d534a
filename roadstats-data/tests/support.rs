use camino::Utf8PathBuf;
use roadstats_core::WorkerSnapshot;
use roadstats_core::test_support::{collector_with_ways, store_with_tiles};
use roadstats_data::save_snapshot;
use tempfile::TempDir;

/// Temporary directory holding snapshots and outputs for one scenario.
pub struct Workspace {
    _dir: TempDir,
    pub root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|err| panic!("failed to create temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp dir {path:?} is not UTF-8"));
        Self { _dir: dir, root }
    }

    pub fn statistics_path(&self) -> Utf8PathBuf {
        self.root.join("out/stats.db")
    }

    pub fn tasks_path(&self) -> Utf8PathBuf {
        self.root.join("out/tasks.json")
    }

    /// Write two disjoint worker snapshots and return their paths.
    pub fn write_worker_snapshots(&self) -> Vec<Utf8PathBuf> {
        let workers = [
            WorkerSnapshot {
                metrics: store_with_tiles(&[7]),
                review: collector_with_ways(&[555]),
            },
            WorkerSnapshot {
                metrics: store_with_tiles(&[42]),
                review: collector_with_ways(&[]),
            },
        ];
        workers
            .iter()
            .enumerate()
            .map(|(index, snapshot)| {
                let path = self.root.join(format!("worker-{index}.json"));
                save_snapshot(&path, snapshot)
                    .unwrap_or_else(|err| panic!("failed to save snapshot {path}: {err}"));
                path
            })
            .collect()
    }
}
