//! Coordinates, bounding boxes and distances.
//!
//! Everything inside the pipeline uses [`LatLng`] (latitude first). External
//! services speak `[lng, lat]`; the conversions live here so the components
//! at each service boundary can call them explicitly.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Approximate length of one degree of latitude in meters.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// A WGS84 coordinate pair, latitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    /// Build from a `[lng, lat]` pair as emitted by GeoJSON and routing
    /// providers. Returns `None` unless the slice holds exactly two finite
    /// numbers.
    pub fn from_lng_lat(pair: &[f64]) -> Option<Self> {
        match pair {
            [lng, lat] if lng.is_finite() && lat.is_finite() => Some(LatLng::new(*lat, *lng)),
            _ => None,
        }
    }

    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// `"lng,lat"`, the form routing endpoints take as a query parameter.
    pub fn to_lng_lat_param(self) -> String {
        format!("{},{}", self.lng, self.lat)
    }

    /// Great-circle distance in meters.
    pub fn haversine_meters(&self, other: &LatLng) -> f64 {
        let (phi1, phi2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();
        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Distance in meters from this point to the segment `a`-`b`.
    ///
    /// Uses an equirectangular projection centred on `self`, accurate to
    /// well under a percent at corridor scales (a few kilometers).
    pub fn distance_to_segment_meters(&self, a: &LatLng, b: &LatLng) -> f64 {
        let k = EARTH_RADIUS_METERS.to_radians();
        let cos_lat = self.lat.to_radians().cos();
        let project = |p: &LatLng| ((p.lng - self.lng) * cos_lat * k, (p.lat - self.lat) * k);
        let (ax, ay) = project(a);
        let (bx, by) = project(b);
        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq == 0.0 {
            0.0
        } else {
            (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0)
        };
        let (px, py) = (ax + t * dx, ay + t * dy);
        (px * px + py * py).sqrt()
    }

    /// Distance in meters to the nearest segment of `polyline`.
    ///
    /// A single-point polyline degrades to point distance; an empty one
    /// yields `f64::INFINITY`.
    pub fn distance_to_polyline_meters(&self, polyline: &[LatLng]) -> f64 {
        match polyline {
            [] => f64::INFINITY,
            [only] => self.haversine_meters(only),
            _ => polyline
                .windows(2)
                .map(|w| self.distance_to_segment_meters(&w[0], &w[1]))
                .fold(f64::INFINITY, f64::min),
        }
    }
}

/// An axis-aligned latitude/longitude rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Build from two opposite corners in any order.
    pub fn new(a: LatLng, b: LatLng) -> Self {
        BoundingBox {
            min_lat: a.lat.min(b.lat),
            min_lng: a.lng.min(b.lng),
            max_lat: a.lat.max(b.lat),
            max_lng: a.lng.max(b.lng),
        }
    }

    /// Smallest box holding every point, or `None` for an empty slice.
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        Some(
            points
                .iter()
                .fold(BoundingBox::new(*first, *first), |bbox, p| BoundingBox {
                    min_lat: bbox.min_lat.min(p.lat),
                    min_lng: bbox.min_lng.min(p.lng),
                    max_lat: bbox.max_lat.max(p.lat),
                    max_lng: bbox.max_lng.max(p.lng),
                }),
        )
    }

    /// Grow the box by roughly `meters` on every side.
    pub fn padded(&self, meters: f64) -> Self {
        let lat_pad = meters / METERS_PER_DEGREE;
        let widest_lat = self.min_lat.abs().max(self.max_lat.abs()).min(89.0);
        let lng_pad = meters / (METERS_PER_DEGREE * widest_lat.to_radians().cos());
        BoundingBox {
            min_lat: (self.min_lat - lat_pad).max(-90.0),
            min_lng: (self.min_lng - lng_pad).max(-180.0),
            max_lat: (self.max_lat + lat_pad).min(90.0),
            max_lng: (self.max_lng + lng_pad).min(180.0),
        }
    }

    pub fn contains(&self, p: &LatLng) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }
}
