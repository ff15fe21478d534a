//! Everything one worker produces, bundled for hand-off.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Merge, MetricStore, ReviewCollector};

/// Metrics and review tasks accumulated by a single worker.
///
/// With the `serde` feature the snapshot round-trips through JSON, so worker
/// processes can write their results to disk for a separate merge step.
/// Finite floats come back bit for bit when `serde_json` has its
/// `float_roundtrip` feature enabled. NaN and infinities have no JSON form.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorkerSnapshot {
    /// Road metrics keyed by tile and country.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metrics: MetricStore,
    /// Ways flagged for manual review.
    #[cfg_attr(feature = "serde", serde(default))]
    pub review: ReviewCollector,
}

impl Merge for WorkerSnapshot {
    fn merge(self, other: Self) -> Self {
        Self {
            metrics: self.metrics.merge(other.metrics),
            review: self.review.merge(other.review),
        }
    }
}
