//! Functional road classes used as the second-level statistics key.
//!
//! The enum is closed: every table and export enumerates all eight classes,
//! in declaration order, whether or not a class carries data.
//!
//! # Examples
//! ```
//! use roadstats_core::RoadClass;
//!
//! assert_eq!(RoadClass::Primary.as_str(), "Primary");
//! assert_eq!(RoadClass::ServiceOther.to_string(), "ServiceOther");
//! assert_eq!(RoadClass::ALL.len(), RoadClass::COUNT);
//! ```

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the eight functional road classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoadClass {
    /// Controlled-access highways.
    Motorway,
    /// Major arterial roads that are not motorways.
    Trunk,
    /// Primary roads linking larger towns.
    Primary,
    /// Secondary roads linking smaller towns.
    Secondary,
    /// Tertiary roads linking villages.
    Tertiary,
    /// Minor public roads without a stronger classification.
    Unclassified,
    /// Roads serving residential areas.
    Residential,
    /// Service roads and everything below them.
    ServiceOther,
}

impl RoadClass {
    /// Number of road classes.
    pub const COUNT: usize = 8;

    /// Every road class in ascending order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Motorway,
        Self::Trunk,
        Self::Primary,
        Self::Secondary,
        Self::Tertiary,
        Self::Unclassified,
        Self::Residential,
        Self::ServiceOther,
    ];

    /// Position of the class within [`RoadClass::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Label stored in the `type` column of the per-class tables.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Motorway => "Motorway",
            Self::Trunk => "Trunk",
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
            Self::Tertiary => "Tertiary",
            Self::Unclassified => "Unclassified",
            Self::Residential => "Residential",
            Self::ServiceOther => "ServiceOther",
        }
    }

    /// Column holding this class's length in the summary tables.
    ///
    /// `PRIMARY` is reserved in SQL, hence `pmary`.
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Motorway => "motorway",
            Self::Trunk => "trunk",
            Self::Primary => "pmary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Unclassified => "unclassified",
            Self::Residential => "residential",
            Self::ServiceOther => "serviceother",
        }
    }
}

impl std::fmt::Display for RoadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a road class.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown road class '{0}'")]
pub struct ParseRoadClassError(pub String);

impl std::str::FromStr for RoadClass {
    type Err = ParseRoadClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "motorway" => Ok(Self::Motorway),
            "trunk" => Ok(Self::Trunk),
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "tertiary" => Ok(Self::Tertiary),
            "unclassified" => Ok(Self::Unclassified),
            "residential" => Ok(Self::Residential),
            "serviceother" | "service_other" | "service" => Ok(Self::ServiceOther),
            _ => Err(ParseRoadClassError(s.to_owned())),
        }
    }
}

/// Per-class accumulator slots for a single partition key.
///
/// Missing classes read as the additive identity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ClassTotals<V> {
    slots: [V; RoadClass::COUNT],
}

impl<V: Copy> ClassTotals<V> {
    /// Value recorded for `class`.
    pub fn get(&self, class: RoadClass) -> V {
        // `index` is always below `COUNT`.
        self.slots[class.index()]
    }

    /// Mutable slot for `class`.
    pub fn get_mut(&mut self, class: RoadClass) -> &mut V {
        &mut self.slots[class.index()]
    }

    /// Iterate `(class, value)` pairs in ascending class order.
    pub fn iter(&self) -> impl Iterator<Item = (RoadClass, V)> + '_ {
        RoadClass::ALL.into_iter().map(|class| (class, self.get(class)))
    }
}

impl ClassTotals<f64> {
    /// Sum across every class.
    pub fn total(&self) -> f64 {
        self.slots.iter().sum()
    }
}
