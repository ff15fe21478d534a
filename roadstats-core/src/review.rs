//! Ways flagged for manual review.
//!
//! The validator records a representative point and the full shape of each
//! suspicious one-way. Only the first report for a way is kept.

use std::collections::BTreeMap;

use geo::Coord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::WayId;
use crate::merge::{Merge, keep_first_ordered};

/// Instruction shown to reviewers for every exported task.
pub const REVIEW_INSTRUCTION: &str = "Check to see if the one way road is logical";

/// A single way awaiting review.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReviewTask {
    /// Point reviewers are taken to first.
    pub location: Coord<f64>,
    /// Full shape of the way.
    pub shape: Vec<Coord<f64>>,
}

/// Review tasks keyed by way id, iterated in ascending id order.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use roadstats_core::ReviewCollector;
///
/// let mut review = ReviewCollector::default();
/// let shape = vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 1.5, y: 2.5 }];
/// assert!(review.add_task(555, Coord { x: 1.0, y: 2.0 }, shape.clone()));
/// assert!(!review.add_task(555, Coord { x: 9.0, y: 9.0 }, Vec::new()));
///
/// let task = review.get(555).expect("task recorded");
/// assert_eq!(task.shape, shape);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReviewCollector {
    tasks: BTreeMap<WayId, ReviewTask>,
}

impl ReviewCollector {
    /// Record a task for `way_id`.
    ///
    /// Returns `false` and leaves the existing task untouched when the way
    /// has already been recorded.
    pub fn add_task(&mut self, way_id: WayId, location: Coord<f64>, shape: Vec<Coord<f64>>) -> bool {
        let mut inserted = false;
        self.tasks.entry(way_id).or_insert_with(|| {
            inserted = true;
            ReviewTask { location, shape }
        });
        inserted
    }

    /// Task recorded for `way_id`, if any.
    pub fn get(&self, way_id: WayId) -> Option<&ReviewTask> {
        self.tasks.get(&way_id)
    }

    /// Iterate tasks in ascending way-id order.
    pub fn iter(&self) -> impl Iterator<Item = (WayId, &ReviewTask)> + '_ {
        self.tasks.iter().map(|(way_id, task)| (*way_id, task))
    }

    /// Number of recorded tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task has been recorded.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Merge for ReviewCollector {
    fn merge(mut self, other: Self) -> Self {
        keep_first_ordered(&mut self.tasks, other.tasks);
        self
    }
}
