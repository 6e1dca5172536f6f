use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// A free-text place query and, once geocoded, where it landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// The raw text the user typed
    pub query: String,
    pub coordinates: Option<LatLng>,
    /// Display label from the geocoder (e.g. "Lyon, France")
    pub label: Option<String>,
    /// Geocoder confidence in [0, 1]
    pub confidence: Option<f64>,
}

impl Location {
    /// A query that has not been geocoded.
    pub fn unresolved(query: impl Into<String>) -> Self {
        Location {
            query: query.into(),
            coordinates: None,
            label: None,
            confidence: None,
        }
    }

    /// A location with known coordinates, e.g. a pin dropped on the map.
    pub fn at(query: impl Into<String>, coordinates: LatLng) -> Self {
        Location {
            coordinates: Some(coordinates),
            ..Location::unresolved(query)
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.coordinates.is_some()
    }
}
