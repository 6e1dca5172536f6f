//! Request and response payloads exchanged with external services.
//!
//! These types mirror the JSON on the wire, including the `[lng, lat]`
//! coordinate order. Nothing past the pipeline components should see them;
//! convert into the typed entities as soon as a payload is received.

use serde::{Deserialize, Serialize};

/// GeoJSON `Point` geometry, `coordinates = [lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

fn point_type() -> String {
    "Point".to_string()
}

impl PointGeometry {
    pub fn point(lng: f64, lat: f64) -> Self {
        PointGeometry {
            kind: point_type(),
            coordinates: vec![lng, lat],
        }
    }
}

// ───────────────────── Geocoding ─────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub features: Vec<GeocodeFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeFeature {
    pub geometry: PointGeometry,
    #[serde(default)]
    pub properties: GeocodeProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeProperties {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub rank_importance: Option<f64>,
}

// ───────────────────── Routing ─────────────────────

/// Directions response. Both the JSON (`routes`) and GeoJSON (`features`)
/// layouts are accepted; `routes` wins when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
    #[serde(default)]
    pub features: Vec<DirectionsFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub geometry: LineGeometry,
    #[serde(default)]
    pub summary: RouteSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsFeature {
    pub geometry: LineGeometry,
    #[serde(default)]
    pub properties: DirectionsProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsProperties {
    #[serde(default)]
    pub summary: RouteSummary,
}

/// `coordinates` is an ordered `[lng, lat]` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGeometry {
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
}

/// Routing providers omit zero-valued summary fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
}

impl DirectionsResponse {
    /// The first route's geometry and summary, in whichever layout arrived.
    pub fn first_route(&self) -> Option<(&LineGeometry, &RouteSummary)> {
        if let Some(route) = self.routes.first() {
            return Some((&route.geometry, &route.summary));
        }
        self.features
            .first()
            .map(|f| (&f.geometry, &f.properties.summary))
    }
}

// ───────────────────── Traffic ─────────────────────

/// One traffic record in its persisted / transmitted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub timestamp: String,
    pub location: PointGeometry,
    pub congestion: f64,
    pub volume: f64,
    pub speed: f64,
}

/// Response of the paged traffic query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficPageResponse {
    #[serde(default)]
    pub data: Vec<ObservationRecord>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
}

// ───────────────────── Prediction ─────────────────────

/// Prediction request body. `x` is longitude, `y` is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub hour: u8,
    pub month: u8,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: f64,
}

/// Error body returned by the prediction service. `detail` is a string for
/// application errors and a list of objects for request validation errors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Outcome of a prediction call that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionReply {
    Predicted { prediction: f64 },
    Rejected { status: u16, detail: Option<String> },
}
