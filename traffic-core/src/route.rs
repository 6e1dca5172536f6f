use serde::Serialize;

use crate::error::{Result, TrafficError};
use crate::geo::{BoundingBox, LatLng};

/// An ordered drivable polyline with its length and travel time.
///
/// Always holds at least two points; "no route" is represented by the
/// absence of a `RouteGeometry`, never by an empty one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    points: Vec<LatLng>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl RouteGeometry {
    pub fn new(points: Vec<LatLng>, distance_meters: f64, duration_seconds: f64) -> Result<Self> {
        if points.len() < 2 {
            return Err(TrafficError::InvalidInput(format!(
                "route geometry needs at least 2 points, got {}",
                points.len()
            )));
        }
        if !(distance_meters.is_finite() && distance_meters >= 0.0)
            || !(duration_seconds.is_finite() && duration_seconds >= 0.0)
        {
            return Err(TrafficError::InvalidInput(format!(
                "route distance/duration must be non-negative (got {} m, {} s)",
                distance_meters, duration_seconds
            )));
        }
        Ok(RouteGeometry {
            points,
            distance_meters,
            duration_seconds,
        })
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn start(&self) -> LatLng {
        self.points[0]
    }

    pub fn end(&self) -> LatLng {
        self.points[self.points.len() - 1]
    }

    /// Tight bounding box around every vertex.
    pub fn bounds(&self) -> BoundingBox {
        // Non-empty by construction.
        BoundingBox::from_points(&self.points).unwrap_or_else(|| BoundingBox::new(self.start(), self.end()))
    }
}
