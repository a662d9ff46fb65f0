//! Bus stop identity and catalog types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque landmark identifier assigned by the tile metadata service.
///
/// The service uses these ("ftid") both to tag features in tile responses
/// and to address stop detail and schedule pages.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureId({})", self.0)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bus stop found near a query point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusStop {
    pub id: FeatureId,
    pub caption: String,
}

/// Bus stops keyed by feature id.
///
/// Insertion keeps the first caption seen for an id; later duplicates are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStops {
    stops: BTreeMap<FeatureId, BusStop>,
}

impl BusStops {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stop unless its id is already present.
    ///
    /// Returns `true` if the stop was added.
    pub fn insert_first(&mut self, id: FeatureId, caption: String) -> bool {
        if self.stops.contains_key(&id) {
            return false;
        }
        self.stops.insert(id.clone(), BusStop { id, caption });
        true
    }

    pub fn get(&self, id: &FeatureId) -> Option<&BusStop> {
        self.stops.get(id)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Stops in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BusStop> {
        self.stops.values()
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}
