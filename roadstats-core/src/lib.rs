//! Core domain types for road-network statistics.
//!
//! Each graph-building worker owns one [`MetricStore`] and one
//! [`ReviewCollector`]. Once every worker has finished, the partial results
//! are folded together with [`Merge`] and handed to the persistence and
//! export layers in `roadstats-data`.
//!
//! Accumulation never fails: keys that have not been seen yet read as zero
//! and are created on first write.

#![forbid(unsafe_code)]

use std::borrow::Borrow;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod merge;
pub mod metrics;
pub mod review;
pub mod road_class;
mod snapshot;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use merge::{Merge, merge_all};
pub use metrics::{MetricMap, MetricStore, PartitionMetrics, ReviewCategory};
pub use review::{REVIEW_INSTRUCTION, ReviewCollector, ReviewTask};
pub use road_class::{ClassTotals, ParseRoadClassError, RoadClass};
pub use snapshot::WorkerSnapshot;

/// Identifier of a graph tile.
pub type TileId = u32;

/// Identifier of an OpenStreetMap way.
pub type WayId = u64;

/// ISO 3166 country code used as a partition key.
///
/// # Examples
///
/// ```
/// use roadstats_core::CountryCode;
///
/// let code = CountryCode::from("DE");
/// assert_eq!(code.as_str(), "DE");
/// assert_eq!(code.to_string(), "DE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CountryCode(String);

impl CountryCode {
    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CountryCode {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CountryCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CountryCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
