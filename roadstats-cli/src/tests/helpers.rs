//! Test helpers for writing worker snapshots to a scratch directory.

use camino::Utf8PathBuf;
use roadstats_core::WorkerSnapshot;
use roadstats_core::test_support::{collector_with_ways, store_with_countries, store_with_tiles};
use roadstats_core::{Merge, RoadClass};
use roadstats_data::save_snapshot;
use tempfile::TempDir;

pub(super) struct Scratch {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
}

impl Scratch {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn write(&self, name: &str, snapshot: &WorkerSnapshot) -> Utf8PathBuf {
        let path = self.root.join(name);
        save_snapshot(&path, snapshot).expect("write snapshot");
        path
    }

    /// Two workers that both claim tile 3 with different trunk lengths.
    pub(super) fn colliding_workers(&self) -> Vec<Utf8PathBuf> {
        let mut first = WorkerSnapshot {
            metrics: store_with_tiles(&[7]).merge(store_with_countries(&["NL"])),
            review: collector_with_ways(&[555]),
        };
        first.metrics.add_tile_road(3, RoadClass::Trunk, 120.5);
        let mut second = WorkerSnapshot {
            metrics: store_with_tiles(&[42]),
            review: collector_with_ways(&[12]),
        };
        second.metrics.add_tile_road(3, RoadClass::Trunk, 40.0);
        vec![
            self.write("worker-a.json", &first),
            self.write("worker-b.json", &second),
        ]
    }
}
